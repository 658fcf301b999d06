/// Type Name Format, the 3 low bits of an NDEF record header
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum NdefType {
    Empty,
    WellKnown,
    Mime,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl NdefType {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Empty,
            1 => Self::WellKnown,
            2 => Self::Mime,
            3 => Self::AbsoluteUri,
            4 => Self::External,
            5 => Self::Unknown,
            6 => Self::Unchanged,
            _ => Self::Reserved,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::WellKnown => 1,
            Self::Mime => 2,
            Self::AbsoluteUri => 3,
            Self::External => 4,
            Self::Unknown => 5,
            Self::Unchanged => 6,
            Self::Reserved => 7,
        }
    }

    /// Best guess of the TNF for a record type given as a string by the host
    pub fn infer_from_type(type_: &str) -> Self {
        match type_ {
            "" => Self::Empty,
            t if t.contains('/') => Self::Mime,
            t if t.contains(':') => Self::External,
            _ => Self::WellKnown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip_all_values() {
        for bits in 0..8u8 {
            assert_eq!(NdefType::from_bits(bits).bits(), bits);
        }
    }

    #[test]
    fn infer_from_type() {
        assert_eq!(NdefType::infer_from_type("T"), NdefType::WellKnown);
        assert_eq!(NdefType::infer_from_type("U"), NdefType::WellKnown);
        assert_eq!(NdefType::infer_from_type("application/json"), NdefType::Mime);
        assert_eq!(NdefType::infer_from_type("android.com:pkg"), NdefType::External);
        assert_eq!(NdefType::infer_from_type(""), NdefType::Empty);
    }
}
