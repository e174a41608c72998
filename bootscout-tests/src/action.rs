use bootscout_core::{boot::action::BootAction, system::variable::RuntimeVariableStore};
use uefi::{println, proto::console::text::Key};

use crate::read_key;

pub fn test_custom_actions() -> anyhow::Result<()> {
    println!("Select the action that you want to test:");
    println!("1. Reboot");
    println!("2. Shutdown");
    println!("3. Reboot to Firmware Setup");
    loop {
        if let Key::Printable(char) = read_key() {
            let action = match char::from(char) {
                '1' => BootAction::Reboot,
                '2' => BootAction::Shutdown,
                '3' => BootAction::ResetToFirmware,
                _ => continue,
            };
            action.run(&mut RuntimeVariableStore);
        }
    }
}
