//! Field access for the 32-bit words that make up a gecko line.

macro_rules! impl_bit {
    ($t:ident) => {
        impl Bit for $t {
            fn bit(self, n: u32) -> bool {
                (self >> n) & 1 == 1
            }

            fn bit_range(self, ls: u32, ms: u32) -> Self {
                (self >> ls) & mask::<$t>(ms - ls + 1)
            }

            fn fits_in(self, width: u32) -> bool {
                width >= $t::BITS || self >> width == 0
            }
        }

        impl BitSet for $t {
            fn set_bit(self, n: u32, val: bool) -> Self {
                (self & !(1 << n)) | ((val as $t) << n)
            }

            fn set_bit_range(self, ls: u32, ms: u32, val: Self) -> Self {
                let mask = mask::<$t>(ms - ls + 1);
                (self & !(mask << ls)) | ((val & mask) << ls)
            }
        }
    }
}

/// A mask of the `width` lowest bits. Saturates at the full width of the type.
fn mask<T: Mask>(width: u32) -> T {
    T::low_bits(width)
}

trait Mask {
    fn low_bits(width: u32) -> Self;
}

macro_rules! impl_mask {
    ($t:ident) => {
        impl Mask for $t {
            fn low_bits(width: u32) -> Self {
                if width >= $t::BITS {
                    $t::MAX
                } else {
                    ((1 as $t) << width) - 1
                }
            }
        }
    }
}

impl_mask!(u32);
impl_mask!(u16);
impl_mask!(u8);

impl_bit!(u32);
impl_bit!(u16);
impl_bit!(u8);

/// Read fields of a word. Bit positions count from the least significant bit.
pub trait Bit {
    #[must_use]
    fn bit(self, n: u32) -> bool;

    /// Extract the bits between `ls` and `ms`, both inclusive.
    #[must_use]
    fn bit_range(self, ls: u32, ms: u32) -> Self;

    /// If the value can be stored in a field `width` bits wide.
    #[must_use]
    fn fits_in(self, width: u32) -> bool;
}

/// Write fields of a word. Values wider than the field are truncated.
pub trait BitSet {
    #[must_use]
    fn set_bit(self, n: u32, val: bool) -> Self;

    #[must_use]
    fn set_bit_range(self, ls: u32, ms: u32, val: Self) -> Self;
}

#[test]
fn set_opcode_byte() {
    let word = 0_u32.set_bit_range(24, 31, 0x8a);
    assert_eq!(word, 0x8a00_0000);

    let word = word.set_bit_range(8, 23, 0xa).set_bit_range(0, 7, 0x3f);
    assert_eq!(word, 0x8a00_0a3f);
}

#[test]
fn set_full_width() {
    assert_eq!(0_u32.set_bit_range(0, 31, 0xdead_beef), 0xdead_beef);
    assert_eq!(0xffff_ffff_u32.set_bit_range(0, 31, 0), 0);
}

#[test]
fn set_truncates() {
    assert_eq!(0_u32.set_bit_range(0, 3, 0x1f), 0xf);
    assert_eq!(0x10_u8.set_bit(4, false), 0);
}

#[test]
fn read_fields() {
    assert_eq!(0x8401_03ba_u32.bit_range(24, 31), 0x84);
    assert_eq!(0x8401_03ba_u32.bit_range(4, 15), 0x03b);
    assert!(0x0100_0000_u32.bit(24));
}

#[test]
fn fits() {
    assert!(0xff_u32.fits_in(8));
    assert!(!0x100_u32.fits_in(8));
    assert!(u32::MAX.fits_in(32));
    assert!(0xffff_u16.fits_in(16));
}
