use util::EnumFromStr;
use util_derive::EnumFromStr;

/// Type tag carried by every variable and temporary.
///
/// `Array` and `Bit` are structural (they wrap a further element type / bit
/// offset, tracked alongside the tag rather than inside it — see
/// `ugbc_core::symbols::variable::Variable`), everything else is a leaf type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumFromStr)]
pub enum DataType {
    Byte,
    SignedByte,
    Word,
    SignedWord,
    DWord,
    SignedDWord,
    Address,
    Position,
    Color,
    StaticString,
    DynamicString,
    Buffer,
    Array,
    Bit,
}

impl DataType {
    /// Width in bits used by the promotion table:
    /// byte/sbyte/color -> 8, word/sword/address/position -> 16, dword/sdword -> 32.
    pub fn width_bits(self) -> Option<u8> {
        match self {
            DataType::Byte | DataType::SignedByte | DataType::Color | DataType::Bit => Some(8),
            DataType::Word | DataType::SignedWord | DataType::Address | DataType::Position => {
                Some(16)
            }
            DataType::DWord | DataType::SignedDWord => Some(32),
            DataType::StaticString
            | DataType::DynamicString
            | DataType::Buffer
            | DataType::Array => None,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            DataType::SignedByte | DataType::SignedWord | DataType::SignedDWord
        )
    }

    pub fn is_numeric(self) -> bool {
        self.width_bits().is_some()
    }

    pub fn is_string(self) -> bool {
        matches!(self, DataType::StaticString | DataType::DynamicString)
    }

    /// Byte size used at bank cleanup time to size the `.res` reservation
    /// for a non-buffer, non-array, non-string scalar.
    pub fn storage_size(self) -> usize {
        match self.width_bits() {
            Some(bits) => (bits / 8) as usize,
            None => 0,
        }
    }

    /// Widest type able to hold either operand, used by `promote`.
    fn rank(self) -> u8 {
        match self {
            DataType::Byte | DataType::SignedByte | DataType::Color | DataType::Bit => 0,
            DataType::Word | DataType::SignedWord | DataType::Address | DataType::Position => 1,
            DataType::DWord | DataType::SignedDWord => 2,
            DataType::StaticString
            | DataType::DynamicString
            | DataType::Buffer
            | DataType::Array => 3,
        }
    }

    /// Implicit promotion of two numeric operands to a common type, following
    /// `width_bits`'s ranking. Returns `None` when either operand is
    /// non-numeric (the caller then raises the operation-specific
    /// "unsupported datatype" error).
    pub fn promote(lhs: DataType, rhs: DataType) -> Option<DataType> {
        if !lhs.is_numeric() || !rhs.is_numeric() {
            return None;
        }
        let signed = lhs.is_signed() || rhs.is_signed();
        let wider = if lhs.rank() >= rhs.rank() { lhs } else { rhs };
        Some(match (wider.width_bits().unwrap(), signed) {
            (8, false) => DataType::Byte,
            (8, true) => DataType::SignedByte,
            (16, false) => DataType::Word,
            (16, true) => DataType::SignedWord,
            (32, false) => DataType::DWord,
            (32, true) => DataType::SignedDWord,
            _ => unreachable!(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::DataType;

    #[test]
    fn promotes_byte_and_word_to_word() {
        assert_eq!(
            Some(DataType::Word),
            DataType::promote(DataType::Byte, DataType::Word)
        );
    }

    #[test]
    fn promotion_carries_signedness() {
        assert_eq!(
            Some(DataType::SignedWord),
            DataType::promote(DataType::SignedByte, DataType::Word)
        );
    }

    #[test]
    fn strings_do_not_promote() {
        assert_eq!(
            None,
            DataType::promote(DataType::StaticString, DataType::Byte)
        );
    }
}
