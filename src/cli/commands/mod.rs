pub mod backup;
pub mod config;
pub mod expense;
pub mod system;

use crate::cli::registry::CommandRegistry;

/// Order in which commands are listed by `help`.
pub const ROOT_COMMAND_ORDER: &[&str] = &[
    "home", "list", "add", "edit", "delete", "total", "chart", "backup", "config", "help",
    "version", "exit",
];

pub fn register_all(registry: &mut CommandRegistry) {
    let mut entries = Vec::new();
    entries.extend(expense::definitions());
    entries.extend(backup::definitions());
    entries.extend(config::definitions());
    entries.extend(system::definitions());

    for name in ROOT_COMMAND_ORDER {
        if let Some(idx) = entries.iter().position(|entry| entry.name == *name) {
            registry.register(entries.swap_remove(idx));
        }
    }
    for entry in entries {
        registry.register(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_is_registered_in_help_order() {
        let mut registry = CommandRegistry::new();
        register_all(&mut registry);
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ROOT_COMMAND_ORDER.to_vec());
    }
}
