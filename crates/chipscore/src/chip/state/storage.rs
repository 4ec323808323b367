//! Register storage backends.
//!
//! # Examples
//!
//! ```
//! use chipscore::chip::state::{ArrayStorage, RegisterStorage};
//!
//! let mut page = ArrayStorage::<u8, 256>::default();
//! page.write(0xB0, 0x32);
//! assert_eq!(page.read(0xB0), Some(0x32));
//! assert_eq!(page.read_or_zero(0xB4), 0);
//! ```

use std::fmt::Debug;

/// Trait for register storage backend
///
/// Abstracts how a chip's register file is kept, so chip models can be
/// written against reads and writes of individual addresses.
pub trait RegisterStorage: Default + Clone + Debug {
    /// Register address type
    type Register: Copy + Eq + Debug;

    /// Register value type
    type Value: Copy + Debug + Default;

    /// Write a value to a register
    fn write(&mut self, register: Self::Register, value: Self::Value);

    /// Read a value from a register
    ///
    /// # Returns
    ///
    /// Some(value) if the register has been written, None otherwise
    fn read(&self, register: Self::Register) -> Option<Self::Value>;

    /// Read a register, treating never-written registers as the default value.
    fn read_or_zero(&self, register: Self::Register) -> Self::Value {
        self.read(register).unwrap_or_default()
    }

    /// Clear all register values
    fn clear(&mut self);

    /// Get the number of registers that have been written
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed-size array storage for chips with a contiguous register space
///
/// # Type Parameters
///
/// * `V` - Register value type (e.g., u8, u16)
/// * `N` - Size of the register array
///
/// Writes outside `0..N` are dropped and reads outside it return `None`.
#[derive(Debug, Clone)]
pub struct ArrayStorage<V = u8, const N: usize = 256>
where
    V: Copy + Debug + Default,
{
    registers: [Option<V>; N],
}

impl<V, const N: usize> Default for ArrayStorage<V, N>
where
    V: Copy + Debug + Default,
{
    fn default() -> Self {
        Self {
            registers: [None; N],
        }
    }
}

impl<V, const N: usize> RegisterStorage for ArrayStorage<V, N>
where
    V: Copy + Debug + Default,
{
    type Register = u8;
    type Value = V;

    fn write(&mut self, register: Self::Register, value: Self::Value) {
        if let Some(slot) = self.registers.get_mut(register as usize) {
            *slot = Some(value);
        }
    }

    fn read(&self, register: Self::Register) -> Option<Self::Value> {
        self.registers.get(register as usize).copied().flatten()
    }

    fn clear(&mut self) {
        self.registers = [None; N];
    }

    fn len(&self) -> usize {
        self.registers.iter().filter(|v| v.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_storage_u8() {
        let mut storage = ArrayStorage::<u8, 256>::default();
        assert!(storage.is_empty());

        storage.write(0x28, 0xF0);
        storage.write(0xFF, 0x01);
        assert_eq!(storage.read(0x28), Some(0xF0));
        assert_eq!(storage.read(0x29), None);
        assert_eq!(storage.read_or_zero(0x29), 0);
        assert_eq!(storage.len(), 2);

        storage.clear();
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_array_storage_bounds() {
        let mut storage = ArrayStorage::<u16, 4>::default();
        storage.write(3, 0x3FF);
        storage.write(4, 0x123);
        assert_eq!(storage.read(3), Some(0x3FF));
        assert_eq!(storage.read(4), None);
        assert_eq!(storage.len(), 1);
    }
}
