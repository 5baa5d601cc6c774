/// Byte order of a multi-byte fixed-width field, chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Big,
    Little,
}
