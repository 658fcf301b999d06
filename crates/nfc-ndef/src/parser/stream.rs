//! Input type for the framing parser

use winnow::{Bytes, Partial, stream::Stream as _};

/// Partial input, so a message cut short reports how many bytes are missing
pub type Stream<'i> = Partial<&'i Bytes>;

pub fn new(bytes: &[u8]) -> Stream<'_> {
    Partial::new(Bytes::new(bytes))
}

/// Bytes not consumed yet
pub fn remaining(input: &Stream<'_>) -> usize {
    input.eof_offset()
}
