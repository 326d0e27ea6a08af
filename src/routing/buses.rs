// Copyright (c) 2024 Mike Tsao

use super::Bus;
use crate::{
    error::{GraphError, RoutingError},
    graph::{ProcessingContext, Target},
};
use log::{debug, warn};
use rustc_hash::FxHashMap;

/// Keeps the named [Bus]es. There is always a [Buses::MASTER] bus, and unless
/// told otherwise, every other bus feeds it.
#[derive(Debug)]
pub struct Buses {
    master: Bus,
    buses: FxHashMap<String, Bus>,
}
impl Buses {
    /// The key of the bus that everything ends up in.
    pub const MASTER: &'static str = "master";

    /// Creates the master bus, pointed at `target` or else at the context's
    /// destination.
    pub fn new_with(
        ctx: &mut ProcessingContext,
        target: Option<Target>,
    ) -> Result<Self, GraphError> {
        let target = target.unwrap_or(Target::Node(ctx.destination()));
        Ok(Self {
            master: Bus::new_with(ctx, Some(target))?,
            buses: Default::default(),
        })
    }

    #[allow(missing_docs)]
    pub fn master(&self) -> &Bus {
        &self.master
    }

    #[allow(missing_docs)]
    pub fn master_mut(&mut self) -> &mut Bus {
        &mut self.master
    }

    /// Adds a bus under `key`, feeding `target` or else the master bus. If the
    /// key is taken, nothing changes and the result is
    /// [RoutingError::DuplicateBus].
    pub fn create(
        &mut self,
        ctx: &mut ProcessingContext,
        key: &str,
        target: Option<Target>,
    ) -> Result<&mut Bus, RoutingError> {
        if self.contains(key) {
            warn!("Bus {key} already exists");
            return Err(RoutingError::DuplicateBus(key.to_string()));
        }
        let target = target.unwrap_or(Target::Node(self.master.input()));
        let bus = Bus::new_with(ctx, Some(target))?;
        debug!("Created bus {key}");
        Ok(self.buses.entry(key.to_string()).or_insert(bus))
    }

    #[allow(missing_docs)]
    pub fn contains(&self, key: &str) -> bool {
        key == Self::MASTER || self.buses.contains_key(key)
    }

    /// Looks a bus up. This never creates one.
    pub fn get(&self, key: &str) -> Option<&Bus> {
        if key == Self::MASTER {
            Some(&self.master)
        } else {
            self.buses.get(key)
        }
    }

    #[allow(missing_docs)]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Bus> {
        if key == Self::MASTER {
            Some(&mut self.master)
        } else {
            self.buses.get_mut(key)
        }
    }

    /// Disposes of the bus under `key`. The key is free again afterward. The
    /// master bus can't be removed.
    pub fn remove(&mut self, ctx: &mut ProcessingContext, key: &str) -> bool {
        if key == Self::MASTER {
            warn!("The master bus can't be removed");
            return false;
        }
        match self.buses.remove(key) {
            Some(bus) => {
                bus.dispose(ctx);
                debug!("Removed bus {key}");
                true
            }
            None => false,
        }
    }

    /// Every key, master first and the rest alphabetically.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.buses.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys.insert(0, Self::MASTER);
        keys
    }

    /// How many buses there are, counting master.
    pub fn len(&self) -> usize {
        self.buses.len() + 1
    }

    /// Always false, since the master bus always exists.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Disposes of every bus, master last.
    pub fn dispose(self, ctx: &mut ProcessingContext) {
        for (_, bus) in self.buses {
            bus.dispose(ctx);
        }
        self.master.dispose(ctx);
    }
}
