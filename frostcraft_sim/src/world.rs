// World block access and a dense reference voxel grid.
//
// `WorldAccess` is the read-only view the sim needs of the host world: which
// material sits at a coordinate, and whether a material is passable
// (air-equivalent). The enclosure analyzer and the generator structure fill
// read the world exclusively through this trait.
//
// `VoxelWorld` is a dense implementation used by headless runs, tests and
// benches. Blocks are stored as `u16` indices into a small material palette
// in a flat `Vec` indexed by `x + z * size_x + y * size_x * size_z`, giving
// O(1) read/write access. The grid has a world-space `origin` so it can cover
// negative coordinates. Out-of-bounds reads return the palette's air material
// (the open sky); out-of-bounds writes are no-ops. The palette holds at most
// `u16::MAX + 1` materials; writing a new material past that is dropped with a
// warning.
//
// See also: `enclosure.rs` and `generator.rs` which consume `WorldAccess`,
// `host.rs` for `WorldSet`, which maps `WorldId`s to worlds.
//
// **Critical constraint: determinism.** The world is read-only during a
// sweep; mutation happens only between ticks through the host.

use crate::types::{Material, VoxelCoord};
use std::collections::BTreeSet;

/// Read-only access to block data of one world.
pub trait WorldAccess {
    /// The material at `coord`.
    fn block_at(&self, coord: VoxelCoord) -> Material;

    /// Whether `material` counts as air for flood-fill purposes.
    fn is_passable(&self, material: &Material) -> bool;
}

/// Dense 3D block grid with a material palette.
#[derive(Clone, Debug)]
pub struct VoxelWorld {
    /// Flat storage of palette indices: index = x + z * size_x + y * size_x * size_z.
    blocks: Vec<u16>,
    /// Palette entry 0 is always the air material.
    palette: Vec<Material>,
    /// Materials treated as passable.
    passable: BTreeSet<Material>,
    /// World-space coordinate of grid cell (0, 0, 0).
    pub origin: VoxelCoord,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
}

impl Default for VoxelWorld {
    fn default() -> Self {
        Self::new(VoxelCoord::new(0, 0, 0), 0, 0, 0)
    }
}

impl VoxelWorld {
    /// Create a new world filled with air. `air`, `cave_air` and `void_air`
    /// are passable.
    pub fn new(origin: VoxelCoord, size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        let passable = ["air", "cave_air", "void_air"]
            .into_iter()
            .map(Material::new)
            .collect();
        Self {
            blocks: vec![0; total],
            palette: vec![Material::air()],
            passable,
            origin,
            size_x,
            size_y,
            size_z,
        }
    }

    /// Mark an additional material as passable (e.g. tall grass).
    pub fn add_passable(&mut self, material: Material) {
        self.passable.insert(material);
    }

    /// Check whether a world coordinate falls inside the grid.
    pub fn in_bounds(&self, coord: VoxelCoord) -> bool {
        let x = coord.x - self.origin.x;
        let y = coord.y - self.origin.y;
        let z = coord.z - self.origin.z;
        x >= 0
            && y >= 0
            && z >= 0
            && (x as u32) < self.size_x
            && (y as u32) < self.size_y
            && (z as u32) < self.size_z
    }

    /// Convert a coordinate to a flat index. Returns `None` if out of bounds.
    fn index(&self, coord: VoxelCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            let x = (coord.x - self.origin.x) as usize;
            let y = (coord.y - self.origin.y) as usize;
            let z = (coord.z - self.origin.z) as usize;
            let sx = self.size_x as usize;
            let sz = self.size_z as usize;
            Some(x + z * sx + y * sx * sz)
        } else {
            None
        }
    }

    /// Palette slot for `material`, adding it if new. `None` once the palette
    /// holds `u16::MAX + 1` materials.
    fn palette_index(&mut self, material: Material) -> Option<u16> {
        if let Some(i) = self.palette.iter().position(|m| *m == material) {
            return u16::try_from(i).ok();
        }
        let slot = u16::try_from(self.palette.len()).ok()?;
        self.palette.push(material);
        Some(slot)
    }

    /// Read a block. Returns air for out-of-bounds coordinates.
    pub fn get(&self, coord: VoxelCoord) -> Material {
        let slot = self.index(coord).map(|i| self.blocks[i]).unwrap_or(0);
        self.palette[slot as usize].clone()
    }

    /// Write a block. No-op for out-of-bounds coordinates, and for a new
    /// material once the palette is full.
    pub fn set(&mut self, coord: VoxelCoord, material: impl Into<Material>) {
        let Some(i) = self.index(coord) else {
            return;
        };
        let material = material.into();
        match self.palette_index(material.clone()) {
            Some(slot) => self.blocks[i] = slot,
            None => log::warn!("palette full; dropping write of {material} at {coord}"),
        }
    }

    /// Fill the axis-aligned box `min..=max` with `material`.
    pub fn fill(&mut self, min: VoxelCoord, max: VoxelCoord, material: impl Into<Material>) {
        let material = material.into();
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                for x in min.x..=max.x {
                    self.set(VoxelCoord::new(x, y, z), material.clone());
                }
            }
        }
    }

    /// Build a hollow box: walls, floor and ceiling of `material` on the
    /// boundary of `min..=max`, air inside.
    pub fn hollow_box(&mut self, min: VoxelCoord, max: VoxelCoord, material: impl Into<Material>) {
        let material = material.into();
        self.fill(min, max, material);
        let inner_min = VoxelCoord::new(min.x + 1, min.y + 1, min.z + 1);
        let inner_max = VoxelCoord::new(max.x - 1, max.y - 1, max.z - 1);
        if inner_min.x <= inner_max.x && inner_min.y <= inner_max.y && inner_min.z <= inner_max.z {
            self.fill(inner_min, inner_max, Material::air());
        }
    }
}

impl WorldAccess for VoxelWorld {
    fn block_at(&self, coord: VoxelCoord) -> Material {
        self.get(coord)
    }

    fn is_passable(&self, material: &Material) -> bool {
        self.passable.contains(material)
    }
}
