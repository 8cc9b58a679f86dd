//! Entity capabilities and touch callbacks, keyed by entity id

use std::collections::HashMap;
use std::fmt;

use super::EntityId;

/// What the player may do with an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    Neither,
    Grabbable,
    Touchable,
    Both,
}

impl Capability {
    pub fn from_flags(grabbable: bool, touchable: bool) -> Self {
        match (grabbable, touchable) {
            (true, true) => Self::Both,
            (true, false) => Self::Grabbable,
            (false, true) => Self::Touchable,
            (false, false) => Self::Neither,
        }
    }

    pub fn is_grabbable(self) -> bool {
        matches!(self, Self::Grabbable | Self::Both)
    }

    pub fn is_touchable(self) -> bool {
        matches!(self, Self::Touchable | Self::Both)
    }

    pub fn is_interactive(self) -> bool {
        self != Self::Neither
    }

    pub fn with_grabbable(self, grabbable: bool) -> Self {
        Self::from_flags(grabbable, self.is_touchable())
    }
}

pub type TouchCallback = Box<dyn FnMut(EntityId)>;

/// Side table of capabilities, built once at setup and passed by reference
#[derive(Default)]
pub struct EntityRegistry {
    capabilities: HashMap<EntityId, Capability>,
    on_touch: HashMap<EntityId, TouchCallback>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capability(&self, id: EntityId) -> Capability {
        self.capabilities.get(&id).copied().unwrap_or_default()
    }

    pub fn set_capability(&mut self, id: EntityId, capability: Capability) {
        if capability == Capability::Neither {
            self.capabilities.remove(&id);
        } else {
            self.capabilities.insert(id, capability);
        }
    }

    pub fn set_grabbable(&mut self, id: EntityId, grabbable: bool) {
        let next = self.capability(id).with_grabbable(grabbable);
        self.set_capability(id, next);
    }

    pub fn is_grabbable(&self, id: EntityId) -> bool {
        self.capability(id).is_grabbable()
    }

    /// Mark an entity touchable and register what touching it does
    pub fn register_touchable<F>(&mut self, id: EntityId, callback: F)
    where
        F: FnMut(EntityId) + 'static,
    {
        let next = Capability::from_flags(self.capability(id).is_grabbable(), true);
        self.set_capability(id, next);
        self.on_touch.insert(id, Box::new(callback));
    }

    /// Run the touch callback. Returns false when none is registered.
    pub fn touch(&mut self, id: EntityId) -> bool {
        match self.on_touch.get_mut(&id) {
            Some(callback) => {
                callback(id);
                true
            }
            None => false,
        }
    }

    /// Drop everything known about a disposed entity
    pub fn forget(&mut self, id: EntityId) {
        self.capabilities.remove(&id);
        self.on_touch.remove(&id);
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("capabilities", &self.capabilities)
            .field("touch_callbacks", &self.on_touch.len())
            .finish()
    }
}
