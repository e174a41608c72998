// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Guesses the operating system behind a loader from its name and location.
//!
//! The guess decides the shortcut letter, the icons, whether the loader starts in graphics mode and which
//! alternative boot options are offered for it.

use alloc::{
    borrow::ToOwned,
    format,
    rc::Rc,
    string::{String, ToString},
    vec::Vec,
};

use log::trace;

use crate::{
    scan::ScanSession,
    system::{
        fs::VolumeFs,
        helper::{basename, contains_ignore_case, dirname, join_path, path_eq},
    },
    target::{DiscoveredTarget, OsFamily, SubEntry, builder::TargetBuilder},
    volume::Volume,
};

/// The path of the macOS loader.
pub const MACOS_LOADER: &str = "System\\Library\\CoreServices\\boot.efi";

/// The path of the Apple Hardware Test.
pub const APPLE_DIAGS: &str = "System\\Library\\CoreServices\\.diagnostics\\diags.efi";

/// The file describing the installed Linux distribution.
const OS_RELEASE: &str = "etc\\os-release";

/// Name fragments of Linux kernels.
const KERNEL_NAMES: [&str; 3] = ["bzimage", "vmlinuz", "kernel"];

/// Names of Windows loaders.
const WINDOWS_NAMES: [&str; 4] = ["cdboot.efi", "bootmgr.efi", "bootmgfw.efi", "bkpbootmgfw.efi"];

/// Checks if a file name looks like a Linux kernel.
#[must_use = "Has no effect if the result is unused"]
pub fn is_kernel_name(name: &str) -> bool {
    KERNEL_NAMES.iter().any(|x| contains_ignore_case(name, x))
}

/// Guesses the OS family of a loader path. The first matching clue wins.
#[must_use = "Has no effect if the result is unused"]
pub fn classify(path: &str) -> OsFamily {
    let name = basename(path).to_ascii_lowercase();

    if is_kernel_name(&name) {
        OsFamily::Linux
    } else if name.contains("refit") || name.contains("refind") {
        OsFamily::BootManager
    } else if path_eq(path, MACOS_LOADER) {
        OsFamily::MacOs
    } else if name == "diags.efi" {
        OsFamily::HwTest
    } else if name.contains("elilo") || name == "e.efi" {
        OsFamily::Elilo
    } else if name.contains("grub") {
        OsFamily::Grub
    } else if WINDOWS_NAMES.contains(&name.as_str()) {
        OsFamily::Windows
    } else if name == "xom.efi" {
        OsFamily::Xom
    } else if name.contains("ipxe") {
        OsFamily::Network
    } else {
        OsFamily::Unknown
    }
}

/// The version suffix of a kernel name, everything after the first `-`, such as `6.1.0-13-amd64` for
/// `vmlinuz-6.1.0-13-amd64`.
#[must_use = "Has no effect if the result is unused"]
pub fn kernel_version(name: &str) -> Option<&str> {
    let (_, version) = name.split_once('-')?;
    let version = version
        .strip_suffix(".efi")
        .or_else(|| version.strip_suffix(".EFI"))
        .unwrap_or(version);
    (!version.is_empty()).then_some(version)
}

/// Finds the initial ramdisk that belongs to a kernel in the same directory.
///
/// An initrd belongs to a versioned kernel if its name contains the version. An unversioned kernel only gets an
/// unversioned initrd.
pub fn find_initrd(fs: &mut dyn VolumeFs, dir: &str, version: Option<&str>) -> Option<String> {
    let mut names: Vec<String> = fs
        .read_dir(dir)
        .ok()?
        .into_iter()
        .filter(|x| !x.is_dir && x.name.to_ascii_lowercase().starts_with("init"))
        .map(|x| x.name)
        .filter(|name| match version {
            Some(version) => name.contains(version),
            None => !name.contains('-'),
        })
        .collect();
    names.sort();
    names.into_iter().next()
}

/// The root options of a Linux kernel: `ro`, with the partition of the volume as root device when it is known.
#[must_use = "Has no effect if the result is unused"]
pub fn root_options(volume: &Volume) -> String {
    match volume.guid_string() {
        Some(guid) => format!("ro root=PARTUUID={guid}"),
        None => "ro".to_owned(),
    }
}

/// The default options of a Linux kernel: the root options followed by the initrd, if one is found.
pub fn linux_options(volume: &Volume, fs: &mut dyn VolumeFs, path: &str) -> String {
    let mut options = root_options(volume);
    let dir = dirname(path);
    if let Some(initrd) = find_initrd(fs, &dir, kernel_version(basename(path))) {
        options.push_str(" initrd=\\");
        options.push_str(&join_path(&dir, &initrd));
    }
    options
}

/// The `ID` of the Linux distribution installed on a volume, from `etc\os-release`.
pub fn os_release_id(fs: &mut dyn VolumeFs) -> Option<String> {
    let content = fs.read(OS_RELEASE).ok()?;
    let content = core::str::from_utf8(&content).ok()?;
    content.lines().find_map(|line| {
        let value = line.trim().strip_prefix("ID=")?;
        let value = value.trim_matches(['"', '\'']);
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Splits a volume name into icon hint words.
fn name_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|x: char| !x.is_ascii_alphanumeric())
        .filter(|x| !x.is_empty())
}

/// Builds the target of a loader, with the icons, graphics mode and sub-entries of its OS family.
pub fn build_loader_target(
    session: &ScanSession,
    volume: &Rc<Volume>,
    fs: &mut dyn VolumeFs,
    path: &str,
    title: &str,
) -> DiscoveredTarget {
    let os = classify(path);
    trace!("{path} looks like {}", os.name());

    let graphics = os
        .graphics_flag()
        .is_some_and(|x| session.policy.graphics_for.contains(x));

    let mut builder = TargetBuilder::loader(title, volume.clone(), path)
        .os(os)
        .graphics(graphics)
        .icon_hint(basename(&dirname(path)));

    if !(volume.is_preboot && session.policy.group_preboot_volumes)
        && let Some(name) = &volume.fs_name
    {
        builder = builder.icon_hints(name_words(name));
    }
    if let Some(name) = &volume.part_name {
        builder = builder.icon_hints(name_words(name));
    }

    match os {
        OsFamily::Linux => {
            if let Some(id) = os_release_id(fs) {
                builder = builder.icon_hint(&id);
            }
            let options = linux_options(volume, fs, path);
            builder = builder
                .load_options(options.clone())
                .sub_options("Boot using default options", &options)
                .sub_options("Boot into single-user mode", &format!("{options} single"))
                .sub_options("Boot with minimal options", &root_options(volume));
        }
        OsFamily::MacOs => {
            builder = builder
                .sub_options("Boot macOS with a 64-bit kernel", "arch=x86_64")
                .sub_options("Boot macOS with a 32-bit kernel", "arch=i386")
                .sub_options("Boot macOS in verbose mode", "-v")
                .sub_options("Boot macOS in single user mode", "-v -s")
                .sub_options("Boot macOS in safe mode", "-v -x");
            if fs.exists(APPLE_DIAGS) {
                builder = builder.sub_entry(SubEntry {
                    title: "Run Apple Hardware Test".to_owned(),
                    load_options: None,
                    loader_path: Some(APPLE_DIAGS.to_owned()),
                    graphics,
                });
            }
        }
        OsFamily::Elilo => {
            builder = builder
                .sub_options("Run ELILO in interactive mode", "-p")
                .sub_options("Boot Linux in mini text mode", "-d 0 mini");
        }
        OsFamily::Xom => {
            builder = builder
                .sub_options("Boot Windows from hard disk", "-s -h")
                .sub_options("Boot Windows from CD-ROM", "-s -c")
                .sub_entry(SubEntry {
                    title: "Run XOM in text mode".to_owned(),
                    load_options: Some("-v".to_owned()),
                    loader_path: None,
                    graphics: false,
                });
        }
        _ => (),
    }

    builder.icon_hints(os.icon_names().iter().copied()).build()
}

#[cfg(test)]
mod tests {
    use uefi::guid;

    use super::*;
    use crate::{
        policy::{GraphicsFor, ScanPolicy},
        scan::legacy::LegacyMode,
        system::{fs::memfs::MemFs, helper::Arch},
        volume::{VolumeId, VolumeKind},
    };

    fn session(policy: ScanPolicy) -> ScanSession {
        ScanSession {
            policy,
            arch: Arch::X64,
            self_location: None,
            legacy_mode: LegacyMode::None,
        }
    }

    #[test]
    fn first_clue_wins() {
        assert_eq!(classify("boot\\vmlinuz-6.1"), OsFamily::Linux);
        assert_eq!(classify("EFI\\refind\\refind_x64.efi"), OsFamily::BootManager);
        assert_eq!(classify("system/library/coreservices/BOOT.EFI"), OsFamily::MacOs);
        assert_eq!(classify("EFI\\elilo\\e.efi"), OsFamily::Elilo);
        assert_eq!(classify("EFI\\ubuntu\\grubx64.efi"), OsFamily::Grub);
        assert_eq!(classify("EFI\\Microsoft\\Boot\\bootmgfw.efi"), OsFamily::Windows);
        assert_eq!(classify("EFI\\tools\\ipxe.efi"), OsFamily::Network);
        assert_eq!(classify("EFI\\BOOT\\bootx64.efi"), OsFamily::Unknown);
        // "grubkernel" is named like a kernel first.
        assert_eq!(classify("grubkernel.efi"), OsFamily::Linux);
    }

    #[test]
    fn kernel_versions() {
        assert_eq!(kernel_version("vmlinuz-6.1.0-13-amd64"), Some("6.1.0-13-amd64"));
        assert_eq!(kernel_version("vmlinuz-6.1.efi"), Some("6.1"));
        assert_eq!(kernel_version("vmlinuz"), None);
    }

    #[test]
    fn initrd_must_match_the_version() {
        let mut fs = MemFs::new()
            .file("boot\\vmlinuz-6.1", b"")
            .file("boot\\initrd.img-5.10", b"")
            .file("boot\\initrd.img-6.1", b"")
            .file("boot\\initrd.img", b"");
        assert_eq!(find_initrd(&mut fs, "boot", Some("6.1")).as_deref(), Some("initrd.img-6.1"));
        assert_eq!(find_initrd(&mut fs, "boot", None).as_deref(), Some("initrd.img"));
        assert_eq!(find_initrd(&mut fs, "boot", Some("7.0")), None);
    }

    #[test]
    fn linux_targets() {
        let mut volume = Volume::new(VolumeId(0), VolumeKind::Internal);
        volume.fs_name = Some("Arch Root".to_owned());
        volume.part_guid = Some(guid!("11111111-2222-3333-4444-555555555555"));
        let volume = Rc::new(volume);
        let mut fs = MemFs::new()
            .file("boot\\vmlinuz-linux", b"")
            .file("boot\\initramfs-linux.img", b"")
            .file("etc\\os-release", b"NAME=\"Arch Linux\"\nID=arch\n");

        let target = build_loader_target(
            &session(ScanPolicy::default()),
            &volume,
            &mut fs,
            "boot\\vmlinuz-linux",
            "Boot Linux",
        );

        let options = "ro root=PARTUUID=11111111-2222-3333-4444-555555555555 initrd=\\boot\\initramfs-linux.img";
        assert_eq!(target.load_options.as_deref(), Some(options));
        assert_eq!(target.icon_hints, ["boot", "arch", "root", "linux"]);
        assert_eq!(target.shortcut_letter, Some('L'));
        assert!(!target.graphics);
        assert_eq!(target.sub_entries.len(), 3);
        assert_eq!(
            target.sub_entries[1].load_options.as_deref(),
            Some(format!("{options} single").as_str())
        );
        assert_eq!(
            target.sub_entries[2].load_options.as_deref(),
            Some("ro root=PARTUUID=11111111-2222-3333-4444-555555555555")
        );
    }

    #[test]
    fn macos_targets() {
        let mut volume = Volume::new(VolumeId(0), VolumeKind::Internal);
        volume.fs_name = Some("Preboot".to_owned());
        volume.is_preboot = true;
        let volume = Rc::new(volume);
        let mut fs = MemFs::new()
            .file(MACOS_LOADER, b"")
            .file(APPLE_DIAGS, b"");

        let target = build_loader_target(
            &session(ScanPolicy::default()),
            &volume,
            &mut fs,
            MACOS_LOADER,
            "Boot macOS",
        );
        assert!(target.graphics);
        assert_eq!(target.icon_hints, ["coreservices", "mac"]);
        assert_eq!(target.sub_entries.len(), 6);
        assert_eq!(target.sub_entries[5].loader_path.as_deref(), Some(APPLE_DIAGS));
    }

    #[test]
    fn graphics_follow_the_policy() {
        let volume = Rc::new(Volume::new(VolumeId(0), VolumeKind::Internal));
        let policy = ScanPolicy {
            graphics_for: GraphicsFor::GRUB | GraphicsFor::WINDOWS,
            ..ScanPolicy::default()
        };
        let mut fs = MemFs::new();
        let session = session(policy);

        let grub = build_loader_target(&session, &volume, &mut fs, "EFI\\debian\\grubx64.efi", "Boot GRUB");
        assert!(grub.graphics);
        let xom = build_loader_target(&session, &volume, &mut fs, "xom.efi", "Boot XOM");
        assert!(xom.graphics);
        assert!(!xom.sub_entries[2].graphics);
        let other = build_loader_target(&session, &volume, &mut fs, "EFI\\x\\x.efi", "Boot x");
        assert!(!other.graphics);
        assert_eq!(other.icon_hints, ["x", "unknown"]);
    }
}
