use bootscout_core::system::variable::{
    BOOTSCOUT_VENDOR, RuntimeVariableStore, get_variable, get_variable_str, set_variable,
    set_variable_str,
};
use uefi::println;

use crate::press_for_reboot;

const VARIABLE_NAME: &str = "TestVariable";
const STRING_VARIABLE_NAME: &str = "TestStringVariable";
const VARIABLE_CONTENT: usize = 23;
const UPDATED_VARIABLE_CONTENT: usize = 24;
const STRING_CONTENT: &str = "Boot EFI\\fedora\\grubx64.efi from ESP";

pub fn check_variable() -> anyhow::Result<()> {
    let mut vars = RuntimeVariableStore;
    if let Some(num) = get_variable::<usize>(&vars, VARIABLE_NAME, &BOOTSCOUT_VENDOR)?
        && num != 0
    {
        assert_ne!(num, UPDATED_VARIABLE_CONTENT);
        if num == VARIABLE_CONTENT {
            println!("Successfully got value of {VARIABLE_NAME}: {num}");
            assert_eq!(
                get_variable_str(&vars, STRING_VARIABLE_NAME, &BOOTSCOUT_VENDOR)?.as_deref(),
                Some(STRING_CONTENT)
            );
            println!("Successfully got value of {STRING_VARIABLE_NAME}");
            set_variable::<usize>(
                &mut vars,
                VARIABLE_NAME,
                &BOOTSCOUT_VENDOR,
                None,
                Some(UPDATED_VARIABLE_CONTENT),
            )?;

            println!("Now testing if variables can be deleted");
            set_variable::<usize>(&mut vars, VARIABLE_NAME, &BOOTSCOUT_VENDOR, None, None)?;
            set_variable_str(&mut vars, STRING_VARIABLE_NAME, &BOOTSCOUT_VENDOR, None, None)?;
            assert!(get_variable::<usize>(&vars, VARIABLE_NAME, &BOOTSCOUT_VENDOR)?.is_none());
            println!("Press a key to reboot");
            press_for_reboot();
        }
    }
    Ok(())
}

pub fn test_variables() -> anyhow::Result<()> {
    let mut vars = RuntimeVariableStore;
    set_variable(
        &mut vars,
        VARIABLE_NAME,
        &BOOTSCOUT_VENDOR,
        None,
        Some(VARIABLE_CONTENT),
    )?;
    set_variable_str(
        &mut vars,
        STRING_VARIABLE_NAME,
        &BOOTSCOUT_VENDOR,
        None,
        Some(STRING_CONTENT),
    )?;
    println!("Set value of {VARIABLE_NAME} to {VARIABLE_CONTENT}");
    assert_eq!(
        get_variable::<usize>(&vars, VARIABLE_NAME, &BOOTSCOUT_VENDOR)?,
        Some(VARIABLE_CONTENT)
    );
    println!("Will now test if variables persist");
    println!("Press a key to reboot");
    press_for_reboot();
}
