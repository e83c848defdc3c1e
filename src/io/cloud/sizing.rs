//! Wire-size estimation for queue messages.
//!
//! A queue measures a message as its base64-encoded body plus, for every
//! attribute, the byte length of the attribute name and its value(s).

use crate::io::cloud::traits::{MessageAttributeValue, MessageAttributes};

/// Length of the padded base64 encoding of `raw_len` bytes.
#[must_use]
pub const fn base64_len(raw_len: usize) -> usize {
    raw_len.div_ceil(3) * 4
}

/// Bytes contributed by a single attribute, name included.
///
/// Slots are inspected in order: string, string list, binary, binary list.
/// An attribute with no populated slot contributes nothing.
#[must_use]
pub fn attribute_size(name: &str, value: &MessageAttributeValue) -> usize {
    let value_len = if let Some(s) = &value.string_value {
        s.len()
    } else if !value.string_list_values.is_empty() {
        value.string_list_values.iter().map(String::len).sum()
    } else if let Some(b) = &value.binary_value {
        b.len()
    } else if !value.binary_list_values.is_empty() {
        value.binary_list_values.iter().map(Vec::len).sum()
    } else {
        return 0;
    };

    name.len() + value_len
}

/// Estimated size of a message on the wire.
#[must_use]
pub fn estimate_message_size(body: &[u8], attributes: &MessageAttributes) -> usize {
    let attrs: usize = attributes
        .iter()
        .map(|(name, value)| attribute_size(name, value))
        .sum();

    base64_len(body.len()) + attrs
}
