// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! An in-memory [`VolumeCatalog`] for host side tests.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use super::{SelfLocation, Volume, VolumeCatalog, VolumeId};
use crate::system::{
    block::{BlockError, Sector, SectorDevice, memdisk::MemDisk},
    fs::{VolumeFs, memfs::MemFs},
    helper::dirname,
};

/// A [`MemDisk`] shared between the catalog and every device opened from it, so that writes stay visible.
struct SharedDisk(Rc<RefCell<MemDisk>>);

impl SectorDevice for SharedDisk {
    fn read_sector(&mut self, lba: u64) -> Result<Sector, BlockError> {
        self.0.borrow_mut().read_sector(lba)
    }

    fn write_sector(&mut self, lba: u64, sector: &Sector) -> Result<(), BlockError> {
        self.0.borrow_mut().write_sector(lba, sector)
    }
}

/// Volumes with in-memory filesystems and disks.
#[derive(Default)]
pub(crate) struct MemCatalog {
    volumes: Vec<Rc<Volume>>,
    filesystems: BTreeMap<VolumeId, MemFs>,
    disks: BTreeMap<VolumeId, Rc<RefCell<MemDisk>>>,
    self_location: Option<SelfLocation>,
    disk_opens: Cell<usize>,
}

impl MemCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a volume, assigning it the next identifier.
    pub(crate) fn add(&mut self, mut volume: Volume) -> VolumeId {
        let id = VolumeId(u32::try_from(self.volumes.len()).unwrap());
        volume.id = id;
        self.volumes.push(Rc::new(volume));
        id
    }

    /// Adds a volume with a filesystem.
    pub(crate) fn add_fs(&mut self, mut volume: Volume, fs: MemFs) -> VolumeId {
        volume.has_fs = true;
        let id = self.add(volume);
        self.filesystems.insert(id, fs);
        id
    }

    /// Adds a volume with raw sectors.
    pub(crate) fn add_disk(&mut self, volume: Volume, disk: MemDisk) -> VolumeId {
        let id = self.add(volume);
        self.disks.insert(id, Rc::new(RefCell::new(disk)));
        id
    }

    /// Attaches raw sectors to a volume that was already added.
    pub(crate) fn attach_disk(&mut self, id: VolumeId, disk: MemDisk) {
        self.disks.insert(id, Rc::new(RefCell::new(disk)));
    }

    /// Records the boot manager as loaded from `path` on a volume.
    pub(crate) fn with_self(mut self, volume: VolumeId, path: &str) -> Self {
        self.self_location = Some(SelfLocation {
            volume,
            dir: dirname(path),
            path: path.to_owned(),
        });
        self
    }

    /// A copy of the current sectors of a volume.
    pub(crate) fn disk(&self, id: VolumeId) -> MemDisk {
        self.disks[&id].borrow().clone()
    }

    pub(crate) fn disk_opens(&self) -> usize {
        self.disk_opens.get()
    }
}

impl VolumeCatalog for MemCatalog {
    fn volumes(&self) -> &[Rc<Volume>] {
        &self.volumes
    }

    fn open_fs(&self, volume: &Volume) -> Option<Box<dyn VolumeFs>> {
        self.filesystems
            .get(&volume.id)
            .map(|x| Box::new(x.clone()) as Box<dyn VolumeFs>)
    }

    fn open_disk(&self, volume: &Volume) -> Option<Box<dyn SectorDevice>> {
        self.disk_opens.set(self.disk_opens.get() + 1);
        self.disks
            .get(&volume.id)
            .map(|x| Box::new(SharedDisk(Rc::clone(x))) as Box<dyn SectorDevice>)
    }

    fn self_location(&self) -> Option<&SelfLocation> {
        self.self_location.as_ref()
    }
}
