use core::fmt;
use uuid::Uuid;

/// A 128-bit identifier that encodes a position in the group hierarchy.
///
/// The id is built from a `(level, number)` pair and is byte-for-byte a valid
/// version-4, IETF-variant UUID. Stores that expect random UUIDs accept it
/// as-is, and the pair can still be read back with [`GroupId::decode`].
///
/// Fields are laid out from **most significant bit (MSB)** to **least
/// significant bit (LSB)**, which matches the big-endian UUID byte order:
///
/// ```text
///  Bit Index:  127        96 95       80 79     76 75      64 63   62 61       0
///              +------------+-----------+---------+----------+-------+----------+
///  Field:      | number(32) | level(16) | ver (4) | zero(12) | var(2)| zero(62) |
///              +------------+-----------+---------+----------+-------+----------+
///  Bytes:      |   0..4     |   4..6    |    6 (high nibble)  |  8 (top 2 bits)  |
///              |<-- MSB --------------- 128 bits ----------------------- LSB -->|
/// ```
///
/// `number` and `level` occupy disjoint bits that the version and variant
/// fields never touch. Two distinct pairs therefore never produce the same id.
///
/// # Example
///
/// ```
/// use dbperf::GroupId;
///
/// let id = GroupId::encode(3, 42);
/// assert_eq!(id.decode(), (3, 42));
/// assert!(id.is_valid());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct GroupId {
    id: u128,
}

const _: () = {
    // Data fields must stay clear of the version and variant bits.
    assert!(GroupId::LEVEL_SHIFT >= GroupId::VERSION_SHIFT + GroupId::VERSION_BITS);
    assert!(GroupId::NUMBER_SHIFT == GroupId::LEVEL_SHIFT + GroupId::LEVEL_BITS);
    assert!(GroupId::NUMBER_SHIFT + GroupId::NUMBER_BITS == u128::BITS);
};

impl GroupId {
    pub const NUMBER_BITS: u32 = 32;
    pub const LEVEL_BITS: u32 = 16;
    pub const VERSION_BITS: u32 = 4;
    pub const VARIANT_BITS: u32 = 2;

    pub const NUMBER_SHIFT: u32 = 96;
    pub const LEVEL_SHIFT: u32 = 80;
    pub const VERSION_SHIFT: u32 = 76;
    pub const VARIANT_SHIFT: u32 = 62;

    pub const NUMBER_MASK: u128 = (1 << Self::NUMBER_BITS) - 1;
    pub const LEVEL_MASK: u128 = (1 << Self::LEVEL_BITS) - 1;
    pub const VERSION_MASK: u128 = (1 << Self::VERSION_BITS) - 1;
    pub const VARIANT_MASK: u128 = (1 << Self::VARIANT_BITS) - 1;

    /// Random-form UUID version nibble.
    pub const VERSION: u128 = 0x4;
    /// IETF (RFC 4122) variant, binary `10`.
    pub const VARIANT: u128 = 0b10;

    const fn valid_mask() -> u128 {
        (Self::NUMBER_MASK << Self::NUMBER_SHIFT)
            | (Self::LEVEL_MASK << Self::LEVEL_SHIFT)
            | (Self::VERSION_MASK << Self::VERSION_SHIFT)
            | (Self::VARIANT_MASK << Self::VARIANT_SHIFT)
    }

    /// Packs `level` and `number` into an id and stamps the version and
    /// variant bits.
    #[must_use]
    pub const fn encode(level: u16, number: u32) -> Self {
        let n = (number as u128) << Self::NUMBER_SHIFT;
        let l = (level as u128) << Self::LEVEL_SHIFT;
        let v = Self::VERSION << Self::VERSION_SHIFT;
        let r = Self::VARIANT << Self::VARIANT_SHIFT;
        Self { id: n | l | v | r }
    }

    /// Returns the id of the group at zero-based position `index` within
    /// `level`. Group numbers are one-based on the wire.
    #[must_use]
    pub const fn from_position(level: u16, index: u32) -> Self {
        debug_assert!(index < u32::MAX, "group index overflow");
        Self::encode(level, index + 1)
    }

    /// Splits the id back into its `(level, number)` pair.
    ///
    /// Only meaningful for ids produced by [`GroupId::encode`]. Ids from other
    /// sources decode to whatever their bits hold.
    #[must_use]
    pub const fn decode(&self) -> (u16, u32) {
        (self.level(), self.number())
    }

    /// Extracts the level from the packed id.
    #[must_use]
    pub const fn level(&self) -> u16 {
        ((self.id >> Self::LEVEL_SHIFT) & Self::LEVEL_MASK) as u16
    }

    /// Extracts the number from the packed id.
    #[must_use]
    pub const fn number(&self) -> u32 {
        ((self.id >> Self::NUMBER_SHIFT) & Self::NUMBER_MASK) as u32
    }

    #[must_use]
    pub const fn version(&self) -> u8 {
        ((self.id >> Self::VERSION_SHIFT) & Self::VERSION_MASK) as u8
    }

    #[must_use]
    pub const fn variant(&self) -> u8 {
        ((self.id >> Self::VARIANT_SHIFT) & Self::VARIANT_MASK) as u8
    }

    /// Returns `true` if the version and variant bits are stamped and every
    /// bit outside the known fields is clear.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        (self.id & !Self::valid_mask()) == 0
            && self.version() as u128 == Self::VERSION
            && self.variant() as u128 == Self::VARIANT
    }

    /// Converts this type into its raw type representation
    #[must_use]
    pub const fn to_raw(&self) -> u128 {
        self.id
    }

    /// Converts a raw type into this type
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self { id: raw }
    }

    /// Big-endian byte form, identical to the UUID wire layout.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 16] {
        self.id.to_be_bytes()
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self::from_raw(u128::from_be_bytes(bytes))
    }
}

impl From<GroupId> for Uuid {
    fn from(id: GroupId) -> Self {
        Self::from_u128(id.to_raw())
    }
}

impl From<Uuid> for GroupId {
    fn from(uuid: Uuid) -> Self {
        Self::from_raw(uuid.as_u128())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from(*self).hyphenated(), f)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupId")
            .field("id", &format_args!("{self}"))
            .field("level", &self.level())
            .field("number", &self.number())
            .finish()
    }
}
