use bootscout_core::{
    boot::{BootScout, launch::services::UefiImageServices},
    system::variable::{BOOTSCOUT_VENDOR, RuntimeVariableStore, get_variable, set_variable},
    target::TargetKind,
};
use uefi::println;

use crate::{press_for_reboot, read_key};

const LOADED_VARIABLE_NAME: &str = "LoadedFromPrevTest";

pub fn check_loaded() -> anyhow::Result<()> {
    let mut vars = RuntimeVariableStore;
    if let Some(num) = get_variable::<usize>(&vars, LOADED_VARIABLE_NAME, &BOOTSCOUT_VENDOR)?
        && num != 0
    {
        set_variable::<usize>(&mut vars, LOADED_VARIABLE_NAME, &BOOTSCOUT_VENDOR, None, None)?;
        println!("Successfully passed load image test");
        println!("Press a key to reboot");
        press_for_reboot();
    }
    Ok(())
}

pub fn test_discovery() -> anyhow::Result<()> {
    let scout = BootScout::new()?;
    let menu = scout.menu();
    println!("Discovered {} targets:", menu.len());
    for (i, target) in scout.list().iter().enumerate() {
        let marker = if i == menu.default_index() { '*' } else { ' ' };
        println!(
            "{marker}{i}: {} [{}] ({:?})",
            target.title,
            target.icon_hint_string(),
            target.qualified_path()
        );
    }

    for pair in scout.list().windows(2) {
        assert!(!pair[0].same_loader(&pair[1]), "Duplicate loaders in menu");
    }
    assert!(menu.is_empty() || menu.default_index() < menu.len());
    println!("All discovery assertions passed!");
    println!("Press a key to reboot");
    press_for_reboot();
}

pub fn test_loading() -> anyhow::Result<()> {
    let mut scout = BootScout::new()?;
    let Some(idx) = scout
        .list()
        .iter()
        .position(|x| matches!(x.kind, TargetKind::Loader))
    else {
        println!("Cannot test if load image works, as no loaders were discovered");
        println!("Press a key to reboot");
        press_for_reboot();
    };

    println!("Will try to start {}", scout.list()[idx].title);
    println!("Press a key to continue");
    let _ = read_key();

    set_variable::<usize>(
        &mut RuntimeVariableStore,
        LOADED_VARIABLE_NAME,
        &BOOTSCOUT_VENDOR,
        None,
        Some(1),
    )?;
    scout.launch(idx, None, &mut UefiImageServices)?;

    Ok(())
}
