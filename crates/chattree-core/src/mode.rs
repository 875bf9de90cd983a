use serde::{Deserialize, Serialize};

/// How the conversation is laid out for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Plain,
    Linear,
    Tree,
}

/// Session view flags. Linear and tree views exclude each other; context
/// mode is independent of both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeFlags {
    pub context_mode: bool,
    pub linear_mode: bool,
    pub tree_mode: bool,
}

impl ModeFlags {
    pub fn toggle_context_mode(&mut self) {
        self.context_mode = !self.context_mode;
    }

    pub fn toggle_linear_mode(&mut self) {
        self.linear_mode = !self.linear_mode;
        if self.linear_mode {
            self.tree_mode = false;
        }
    }

    pub fn toggle_tree_mode(&mut self) {
        self.tree_mode = !self.tree_mode;
        if self.tree_mode {
            self.linear_mode = false;
        }
    }

    pub fn display(&self) -> DisplayMode {
        match (self.linear_mode, self.tree_mode) {
            (true, _) => DisplayMode::Linear,
            (_, true) => DisplayMode::Tree,
            _ => DisplayMode::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_and_tree_exclude_each_other() {
        let mut modes = ModeFlags::default();
        modes.toggle_context_mode();
        modes.toggle_linear_mode();
        assert_eq!(modes.display(), DisplayMode::Linear);

        modes.toggle_tree_mode();
        assert!(!modes.linear_mode);
        assert_eq!(modes.display(), DisplayMode::Tree);
        assert!(modes.context_mode);

        modes.toggle_tree_mode();
        assert_eq!(modes.display(), DisplayMode::Plain);
    }
}
