use bootscout_core::{
    scan::validate::is_valid_loader,
    system::{
        fs::{UefiFileSystem, VolumeFs},
        helper::{Arch, join_path},
    },
};
use uefi::println;

use crate::press_for_reboot;

pub fn test_filesystem() -> anyhow::Result<()> {
    let mut fs = UefiFileSystem::from_image_fs()?;
    let arch = Arch::current().unwrap_or(Arch::X64);

    let label = fs.volume_label();
    println!("Volume label of the boot manager's volume: {label:?}");

    let entries = fs.read_dir("\\")?;
    assert!(!entries.is_empty(), "The root directory should not be empty");
    for entry in &entries {
        let path = join_path("\\", &entry.name);
        let info = fs.file_info(&path)?;
        assert_eq!(info.name, entry.name);
        println!("{path} ({} bytes)", info.size);
    }

    let fallback = arch.fallback_path();
    if fs.exists(&fallback) {
        let content = fs.read(&fallback)?;
        let mut header = [0; 512];
        let read = fs.read_header(&fallback, &mut header)?;
        assert_eq!(&header[..read], &content[..read]);
        assert!(is_valid_loader(Some(&mut fs as &mut dyn VolumeFs), &fallback, arch));
        println!("{fallback} is a valid loader for this machine");
    } else {
        println!("{fallback} does not exist, skipping the loader check");
    }

    assert!(!fs.exists("\\this\\path\\does\\not\\exist.efi"));
    println!("All filesystem assertions passed!");
    println!("Press a key to reboot");
    press_for_reboot();
}
