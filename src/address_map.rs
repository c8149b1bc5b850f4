// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sparse, keyed storage for one data class (registers or coils).

use std::collections::HashMap;

use crate::frame::AddressSpan;

/// A mapping from a 16-bit address to a value, distinguishing an
/// unregistered address from a registered-but-default one.
#[derive(Debug, Clone, Default)]
pub struct AddressMap<V> {
    values: HashMap<u16, V>,
}

impl<V: Default> AddressMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Register every address in `span`, inserting the default value for
    /// addresses not already registered. Re-registering an address never
    /// overwrites its current value.
    pub fn add_span(&mut self, span: AddressSpan) {
        for address in span.addresses() {
            self.values.entry(address).or_default();
        }
    }

    /// Deregister every address in `span`.
    pub fn remove_span(&mut self, span: AddressSpan) {
        for address in span.addresses() {
            self.values.remove(&address);
        }
    }

    /// `None` iff `address` is not registered.
    #[must_use]
    pub fn get(&self, address: u16) -> Option<&V> {
        self.values.get(&address)
    }

    #[must_use]
    pub fn contains(&self, address: u16) -> bool {
        self.values.contains_key(&address)
    }

    /// Returns `false` iff `address` is not registered.
    pub fn set(&mut self, address: u16, value: V) -> bool {
        match self.values.get_mut(&address) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
