//! Scoped allocation of texture binding slots.
//!
//! Passes bind their input textures through a [`TextureUnitContext`]. Contexts
//! nest like scopes: a child context allocates above its parent's units, and
//! dropping it frees exactly the units it bound. Only the innermost context
//! may bind. Dropping a context out of order also closes every context opened
//! after it.

use std::cell::{Cell, RefCell};

use crate::error::{PrismError, Result};

/// Identifier of a texture as seen by the allocator.
pub type TextureId = u64;

/// A hardware texture binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureUnit(pub u32);

impl TextureUnit {
    /// Returns the slot index.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The result of binding a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitBinding {
    /// The unit the texture is bound to.
    pub unit: TextureUnit,
    /// True if the unit already held this texture, so no rebind is needed.
    pub already_resident: bool,
}

/// Allocator over a fixed pool of texture units.
#[derive(Debug)]
pub struct TextureUnitAllocator {
    count: u32,
    /// Serials of the open contexts, innermost last.
    open: RefCell<Vec<u64>>,
    next_serial: Cell<u64>,
    /// Next unit to hand out.
    next: Cell<u32>,
    /// Texture last bound to each unit, kept across contexts.
    resident: RefCell<Vec<Option<TextureId>>>,
}

impl TextureUnitAllocator {
    /// Creates an allocator managing `count` units.
    pub fn new(count: u32) -> Self {
        Self {
            count,
            open: RefCell::new(Vec::new()),
            next_serial: Cell::new(0),
            next: Cell::new(0),
            resident: RefCell::new(vec![None; count as usize]),
        }
    }

    /// Returns the number of units in the pool.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the number of units currently held by open contexts.
    pub fn units_in_use(&self) -> u32 {
        self.next.get()
    }

    /// Returns the number of open contexts.
    pub fn depth(&self) -> usize {
        self.open.borrow().len()
    }

    /// Opens a new innermost context.
    pub fn begin_context(&self) -> TextureUnitContext<'_> {
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);
        let base = self.next.get();
        self.open.borrow_mut().push(serial);
        TextureUnitContext {
            allocator: self,
            serial,
            base,
        }
    }

    fn is_innermost(&self, serial: u64) -> bool {
        self.open.borrow().last() == Some(&serial)
    }

    /// Runs `f` inside a fresh context.
    pub fn with_context<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&TextureUnitContext<'_>) -> std::result::Result<T, E>,
    {
        let context = self.begin_context();
        f(&context)
    }

    /// Forgets which textures are resident, e.g. after the device was reset.
    pub fn invalidate(&self) {
        self.resident.borrow_mut().fill(None);
    }
}

/// A scope of texture unit allocations.
#[derive(Debug)]
pub struct TextureUnitContext<'a> {
    allocator: &'a TextureUnitAllocator,
    serial: u64,
    base: u32,
}

impl TextureUnitContext<'_> {
    /// Binds `texture` to the next free unit.
    ///
    /// Fails with [`PrismError::TextureUnitContextNotCurrent`] if a nested
    /// context is open, and with [`PrismError::TextureUnitsExhausted`] when
    /// the pool is used up.
    pub fn bind(&self, texture: TextureId) -> Result<UnitBinding> {
        let allocator = self.allocator;
        if !allocator.is_innermost(self.serial) {
            log::error!("texture unit context {} is not the innermost", self.serial);
            return Err(PrismError::TextureUnitContextNotCurrent);
        }
        let index = allocator.next.get();
        if index >= allocator.count {
            return Err(PrismError::TextureUnitsExhausted {
                count: allocator.count,
            });
        }
        allocator.next.set(index + 1);

        let mut resident = allocator.resident.borrow_mut();
        let already_resident = resident[index as usize] == Some(texture);
        resident[index as usize] = Some(texture);
        Ok(UnitBinding {
            unit: TextureUnit(index),
            already_resident,
        })
    }

    /// Returns the number of units bound by this context.
    pub fn bound_count(&self) -> u32 {
        if self.allocator.is_innermost(self.serial) {
            self.allocator.next.get().saturating_sub(self.base)
        } else {
            0
        }
    }
}

impl Drop for TextureUnitContext<'_> {
    fn drop(&mut self) {
        let allocator = self.allocator;
        let mut open = allocator.open.borrow_mut();
        let Some(level) = open.iter().position(|&serial| serial == self.serial) else {
            // Already closed along with an outer context.
            return;
        };
        if level + 1 != open.len() {
            log::error!(
                "texture unit context {} closed with {} nested contexts still open",
                self.serial,
                open.len() - level - 1
            );
        }
        open.truncate(level);
        allocator.next.set(self.base);
    }
}
