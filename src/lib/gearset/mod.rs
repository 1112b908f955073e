//! A forest of gears, linked by parent id.
//!
//! Gears are owned here, not by each other. Each gear knows its parent's id; the set answers tree
//! questions (children, roots, depth) and drives rotation through the meshes.
use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::gear::generate_id;
use crate::geometry::Degrees;
use crate::{ConfigurationError, Gear, GearParams};

/// Size of the box holding every gear in a set, in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dimensions {
    pub w: f64,
    pub h: f64,
}

#[derive(Clone, Debug, Default)]
pub struct GearSet {
    gears: Vec<Gear>,
}

impl GearSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set by adding each of `params` in turn. Parents must come before their children.
    pub fn from_params<I>(params: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = GearParams>,
    {
        let mut set = GearSet::new();
        for p in params {
            set.add(p)?;
        }
        Ok(set)
    }

    /// Resolve and add a gear, returning its id. `params.parent`, if set, must name a gear that is
    /// already in the set. Gears without an id get a generated one that no gear here has taken.
    pub fn add(&mut self, mut params: GearParams) -> Result<String, ConfigurationError> {
        match &params.id {
            Some(id) if self.get(id).is_some() => {
                return Err(ConfigurationError::InvalidTopology(format!(
                    "a gear with id {id} already exists"
                )));
            }
            Some(_) => {}
            None => params.id = Some(self.unused_id(generate_id)),
        }
        let parent = self.lookup_parent(params.parent.as_deref())?;
        let gear = Gear::new(params, parent)?;
        let id = gear.id().to_string();
        self.gears.push(gear);
        Ok(id)
    }

    /// First id from `generate` that isn't already in the set
    fn unused_id<F>(&self, mut generate: F) -> String
    where
        F: FnMut() -> String,
    {
        loop {
            let id = generate();
            if self.get(&id).is_none() {
                return id;
            }
            debug!(%id, "generated id is taken, skipping");
        }
    }

    fn lookup_parent(&self, parent: Option<&str>) -> Result<Option<&Gear>, ConfigurationError> {
        parent
            .map(|pid| {
                self.get(pid).ok_or_else(|| {
                    ConfigurationError::InvalidTopology(format!("unknown parent gear {pid}"))
                })
            })
            .transpose()
    }

    pub fn get(&self, id: &str) -> Option<&Gear> {
        self.gears.iter().find(|g| g.id() == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.gears.iter().position(|g| g.id() == id)
    }

    /// Gears in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Gear> {
        self.gears.iter()
    }

    pub fn len(&self) -> usize {
        self.gears.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gears.is_empty()
    }

    pub fn roots(&self) -> Vec<&Gear> {
        self.gears.iter().filter(|g| g.parent_id().is_none()).collect()
    }

    pub fn children(&self, id: &str) -> Vec<&Gear> {
        self.gears
            .iter()
            .filter(|g| g.parent_id() == Some(id))
            .collect()
    }

    /// Everything below `id`, breadth first, so every gear comes after its parent
    pub fn descendants(&self, id: &str) -> Vec<&Gear> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);
        while let Some(next) = queue.pop_front() {
            for child in self.children(next) {
                out.push(child);
                queue.push_back(child.id());
            }
        }
        out
    }

    /// Rebuild gear `id` from new parameters, along with everything hanging off it.
    ///
    /// Children re-resolve from their own stored parameters, so a new pitch, pressure angle or
    /// scale flows down the tree and positions follow. Nothing changes if any gear in the subtree
    /// fails to resolve. Cached rotations in the subtree are reset; drive the set again.
    pub fn replace(&mut self, id: &str, mut params: GearParams) -> Result<(), ConfigurationError> {
        if self.index_of(id).is_none() {
            return Err(ConfigurationError::InvalidTopology(format!(
                "no gear with id {id}"
            )));
        }
        params.id = Some(id.to_string());

        let subtree = self.descendants(id);
        if let Some(pid) = params.parent.as_deref() {
            if pid == id || subtree.iter().any(|g| g.id() == pid) {
                return Err(ConfigurationError::InvalidTopology(format!(
                    "gear {pid} cannot become the parent of its own ancestor {id}"
                )));
            }
        }

        let parent = self.lookup_parent(params.parent.as_deref())?;
        let mut rebuilt: HashMap<String, Gear> = HashMap::new();
        rebuilt.insert(id.to_string(), Gear::new(params, parent)?);
        for g in &subtree {
            let gear = match g.parent_id().and_then(|pid| rebuilt.get(pid)) {
                Some(parent) => Gear::new(g.params().clone(), Some(parent))?,
                None => {
                    return Err(ConfigurationError::InvalidTopology(format!(
                        "gear {} lost its parent during rebuild",
                        g.id()
                    )))
                }
            };
            rebuilt.insert(g.id().to_string(), gear);
        }

        debug!(id, rebuilt = rebuilt.len(), "rebuilt subtree");
        for slot in self.gears.iter_mut() {
            if let Some(gear) = rebuilt.remove(slot.id()) {
                *slot = gear;
            }
        }
        Ok(())
    }

    /// Remove a gear that nothing hangs off.
    pub fn remove(&mut self, id: &str) -> Result<Gear, ConfigurationError> {
        let index = self.index_of(id).ok_or_else(|| {
            ConfigurationError::InvalidTopology(format!("no gear with id {id}"))
        })?;
        if !self.children(id).is_empty() {
            return Err(ConfigurationError::InvalidTopology(format!(
                "gear {id} still has children"
            )));
        }
        Ok(self.gears.remove(index))
    }

    /// Check that every parent exists, the parent links form a forest, and no ring meshes with a
    /// ring.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let result = self.check();
        if let Err(e) = &result {
            warn!(error = %e, "gear set failed validation");
        }
        result
    }

    fn check(&self) -> Result<(), ConfigurationError> {
        for g in &self.gears {
            let mut steps = 0;
            let mut current = g;
            while let Some(pid) = current.parent_id() {
                let parent = self.get(pid).ok_or_else(|| {
                    ConfigurationError::InvalidTopology(format!(
                        "gear {} has missing parent {pid}",
                        current.id()
                    ))
                })?;
                if parent.is_internal() && current.is_internal() {
                    return Err(ConfigurationError::IncompatibleMesh {
                        child: current.id().to_string(),
                        parent: pid.to_string(),
                    });
                }
                steps += 1;
                if steps > self.gears.len() {
                    return Err(ConfigurationError::InvalidTopology(format!(
                        "gear {} is its own ancestor",
                        g.id()
                    )));
                }
                current = parent;
            }
        }
        Ok(())
    }

    /// Box around every gear's square, with the top and left edges clamped at zero
    pub fn dimensions(&self) -> Dimensions {
        if self.gears.is_empty() {
            return Dimensions::default();
        }
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for g in &self.gears {
            let half = g.size() / 2.0;
            let p = g.position();
            x_min = x_min.min(p.x - half);
            x_max = x_max.max(p.x + half);
            y_min = y_min.min(p.y - half);
            y_max = y_max.max(p.y + half);
        }
        Dimensions {
            w: x_max - x_min.max(0.0),
            h: y_max - y_min.max(0.0),
        }
    }

    /// Gears sorted by layer, lowest first. Gears on the same layer keep insertion order.
    pub fn draw_order(&self) -> Vec<&Gear> {
        let mut gears: Vec<&Gear> = self.gears.iter().collect();
        gears.sort_by_key(|g| g.layer());
        gears
    }

    /// Indices of the gears, shallowest first
    fn depth_order(&self, parents: &[Option<usize>]) -> Vec<usize> {
        let depth = |mut i: usize| {
            let mut d = 0;
            while let Some(p) = parents[i] {
                d += 1;
                i = p;
                if d > parents.len() {
                    break;
                }
            }
            d
        };
        let mut order: Vec<usize> = (0..self.gears.len()).collect();
        order.sort_by_key(|&i| depth(i));
        order
    }

    /// Turn the whole set to drive angle `global`, caching each gear's rotation.
    ///
    /// Parents are always evaluated before their children, so each gear only reads the rotation
    /// its parent got in this same pass.
    pub fn drive(&mut self, global: Degrees) {
        let parents: Vec<Option<usize>> = self
            .gears
            .iter()
            .map(|g| g.parent_id().and_then(|pid| self.index_of(pid)))
            .collect();
        for i in self.depth_order(&parents) {
            let parent_rotation = parents[i]
                .map(|p| self.gears[p].rotation())
                .unwrap_or_default();
            let rotation = self.gears[i].rotation_from(global, parent_rotation);
            self.gears[i].set_rotation(rotation);
        }
        debug!(global = global.0, gears = self.gears.len(), "drove gear set");
    }

    /// Rotation of gear `id` at drive angle `global`, worked out from scratch along its ancestor
    /// chain. Doesn't need or touch the cache from [`GearSet::drive`].
    pub fn rotation_at(&self, id: &str, global: Degrees) -> Option<Degrees> {
        let mut chain = vec![self.get(id)?];
        while let Some(pid) = chain[chain.len() - 1].parent_id() {
            if chain.len() > self.gears.len() {
                return None;
            }
            chain.push(self.get(pid)?);
        }
        Some(
            chain
                .iter()
                .rev()
                .fold(Degrees(0.0), |parent_rotation, g| {
                    g.rotation_from(global, parent_rotation)
                }),
        )
    }

    /// Speed of gear `id` relative to its root
    pub fn total_ratio(&self, id: &str) -> Option<f64> {
        self.get(id).map(|g| g.total_ratio())
    }
}
