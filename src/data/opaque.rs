use std::ffi::c_void;

/// Cleanup hook for a pointer stored in the opaque slot.
pub type OpaqueDeleter = fn(*mut c_void);

/// A value that fits the 64-bit opaque slot.
pub trait OpaqueValue: Copy {
    fn into_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
}

macro_rules! impl_opaque_int {
    ($($t:ty => $u:ty),* $(,)?) => {
        $(
            impl OpaqueValue for $t {
                fn into_bits(self) -> u64 {
                    self as $u as u64
                }

                fn from_bits(bits: u64) -> Self {
                    bits as $u as $t
                }
            }
        )*
    };
}

impl_opaque_int! {
    i8 => u8,
    i16 => u16,
    i32 => u32,
    i64 => u64,
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    usize => usize,
}

impl OpaqueValue for bool {
    fn into_bits(self) -> u64 {
        self as u64
    }

    fn from_bits(bits: u64) -> Self {
        bits & 0xff != 0
    }
}

impl OpaqueValue for f32 {
    fn into_bits(self) -> u64 {
        self.to_bits() as u64
    }

    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl OpaqueValue for f64 {
    fn into_bits(self) -> u64 {
        self.to_bits()
    }

    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

impl OpaqueValue for *mut c_void {
    fn into_bits(self) -> u64 {
        self as usize as u64
    }

    fn from_bits(bits: u64) -> Self {
        bits as usize as *mut c_void
    }
}

/// One tagged-union-style word of user data plus an optional deleter.
#[derive(Debug, Default)]
pub(crate) struct OpaqueSlot {
    bits: u64,
    deleter: Option<OpaqueDeleter>,
}

impl OpaqueSlot {
    pub fn get<T: OpaqueValue>(&self) -> T {
        T::from_bits(self.bits)
    }

    /// Overwrites the value, first releasing an owned pointer if one is held.
    pub fn set<T: OpaqueValue>(&mut self, value: T) {
        self.release();
        self.bits = value.into_bits();
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn has_deleter(&self) -> bool {
        self.deleter.is_some()
    }

    /// Stores `ptr` and takes ownership of it through `deleter`, first
    /// releasing whatever pointer was owned before.
    pub fn set_owned(&mut self, ptr: *mut c_void, deleter: Option<OpaqueDeleter>) {
        self.release();
        self.bits = ptr.into_bits();
        self.deleter = deleter;
    }

    /// Value copy for deep clones; ownership stays with the original.
    pub fn duplicate(&self) -> Self {
        Self {
            bits: self.bits,
            deleter: None,
        }
    }

    /// Runs the deleter on a non-null value and empties the slot.
    pub fn release(&mut self) {
        if let Some(deleter) = self.deleter.take() {
            if self.bits != 0 {
                deleter(<*mut c_void>::from_bits(self.bits));
            }
        }
        self.bits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DELETED: AtomicUsize = AtomicUsize::new(0);
    static REPLACED: AtomicUsize = AtomicUsize::new(0);

    fn count_delete(_: *mut c_void) {
        DELETED.fetch_add(1, Ordering::SeqCst);
    }

    fn count_replace(_: *mut c_void) {
        REPLACED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn values_share_one_word() {
        let mut slot = OpaqueSlot::default();
        slot.set(-2i8);
        assert_eq!(slot.get::<i8>(), -2);
        assert_eq!(slot.bits(), 0xfe);

        slot.set(1.5f64);
        assert_eq!(slot.get::<f64>(), 1.5);

        slot.set(-7i64);
        assert_eq!(slot.get::<i64>(), -7);
    }

    #[test]
    fn owned_pointer_is_deleted_once() {
        let before = DELETED.load(Ordering::SeqCst);
        let mut slot = OpaqueSlot::default();
        slot.set_owned(0x1000 as *mut c_void, Some(count_delete));

        let copy = slot.duplicate();
        assert!(!copy.has_deleter());
        assert_eq!(copy.bits(), 0x1000);

        slot.release();
        slot.release();
        assert_eq!(DELETED.load(Ordering::SeqCst), before + 1);
        assert_eq!(slot.bits(), 0);
    }

    #[test]
    fn plain_set_releases_owned_pointer() {
        let mut slot = OpaqueSlot::default();
        slot.set_owned(0x2000 as *mut c_void, Some(count_replace));
        slot.set(5u32);
        assert!(!slot.has_deleter());
        assert_eq!(slot.get::<u32>(), 5);
        assert_eq!(REPLACED.load(Ordering::SeqCst), 1);
    }
}
