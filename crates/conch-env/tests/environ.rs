//! Integration tests for the environment store.
//!
//! These tests drive the public API the way the shell does:
//! - seeding from a config file
//! - scoped overrides around a command
//! - rendering the prompt
//! - resolving a command to spawn

use std::io::Write;

use conch_env::prompt::{PromptFields, format_prompt, partial_format_prompt};
use conch_env::{
    Converter, Env, EnvError, EnvValue, Registry, TokenSet, apply_static_config,
    load_static_config,
};
use serde_json::json;

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_seed_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create config");
        write!(
            file,
            r#"{{"env": {{"HISTCONTROL": "ignoredups,ErasEdups", "SHOW_TRACEBACK": "yes"}}}}"#
        )
        .expect("write config");

        let mut env = Env::new();
        let conf = load_static_config(&mut env, file.path());
        apply_static_config(&mut env, &conf).expect("apply config");

        assert_eq!(env.get_bool("LOADED_CONFIG"), Some(true));
        assert_eq!(env.get_bool("SHOW_TRACEBACK"), Some(true));
        let hc = env.get_tokens("HISTCONTROL").expect("HISTCONTROL");
        assert!(hc.contains("erasedups"));
        assert_eq!(env.detype()["HISTCONTROL"], "erasedups,ignoredups");
    }
}

// =============================================================================
// Swap Tests
// =============================================================================

mod swap {
    use super::*;

    #[test]
    fn test_swap_around_command() {
        let mut env = Env::from_vars([("PATH", json!(["/usr/bin"])), ("EDITOR", json!("vi"))])
            .expect("build env");
        let before = env.detype().clone();

        {
            let mut scoped = env
                .swap([("EDITOR", json!("ed")), ("PAGER", json!("less"))])
                .expect("swap");
            scoped.set("EDITOR", "nano").expect("set inside swap");
            assert_eq!(scoped.detype()["EDITOR"], "nano");
            assert_eq!(scoped.detype()["PAGER"], "less");
            assert_eq!(scoped.depth(), 1);
        }

        assert_eq!(env.depth(), 0);
        assert_eq!(env.detype(), &before);
    }

    #[test]
    fn test_failed_swap_changes_nothing() {
        let mut env = Env::from_vars([("HISTSIZE", 10)]).expect("build env");
        let err = env
            .swap([("EDITOR", json!("vi")), ("HISTSIZE", json!("many"))])
            .err()
            .expect("swap should fail");
        assert!(matches!(err, EnvError::Coerce { .. }));
        assert!(!env.contains("EDITOR"));
        assert_eq!(env.get_int("HISTSIZE"), Some(10));
        assert_eq!(env.depth(), 0);
    }
}

// =============================================================================
// Registry Tests
// =============================================================================

mod registry {
    use super::*;

    #[test]
    fn test_custom_registry() {
        let registry = Registry::builtin()
            .declare("CONCH_DEBUG", Converter::BOOL)
            .declare(
                "CDPATH_OPTS",
                Converter::TOKENS.with_default(|| EnvValue::Tokens(TokenSet::new())),
            );
        let mut env = Env::with_registry(registry);
        env.set("CONCH_DEBUG", "off").expect("set bool");
        assert_eq!(env.get_bool("CONCH_DEBUG"), Some(false));
        assert_eq!(env.detype().get("CONCH_DEBUG").map(String::as_str), Some(""));
        assert!(env.get_tokens("CDPATH_OPTS").expect("default").is_empty());
    }
}

// =============================================================================
// Prompt Tests
// =============================================================================

mod prompt {
    use super::*;

    #[test]
    fn test_prompt_from_env() {
        let env = Env::from_vars([("USER", "wakka"), ("GIT_BRANCH", "main")]).expect("build env");
        let fields = PromptFields::new()
            .literal("user", "wakka")
            .producer("branch", || Ok(None))
            .with_env(&env);

        assert_eq!(
            format_prompt("{user}{branch: ({})} {$GIT_BRANCH}> ", &fields),
            "wakka main> "
        );
        assert_eq!(
            partial_format_prompt("{user} {unknown} {$MISSING}", &fields),
            "wakka {unknown} {$MISSING}"
        );
    }
}

// =============================================================================
// Locator Tests
// =============================================================================

#[cfg(unix)]
mod locate {
    use std::os::unix::fs::PermissionsExt;

    use conch_env::locate_binary;

    use super::*;

    #[test]
    fn test_locate_after_path_edit() {
        let bin = tempfile::tempdir().expect("create bin dir");
        let tool = bin.path().join("conch-tool");
        std::fs::write(&tool, "#!/bin/sh\n").expect("write tool");
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755))
            .expect("chmod tool");

        let mut env = Env::from_vars([("PATH", json!(["/nonexistent/bin"]))]).expect("build env");
        assert_eq!(locate_binary(&env, "conch-tool"), None);

        env.get_path_mut("PATH")
            .expect("PATH is a path list")
            .push(bin.path().display().to_string());
        assert_eq!(locate_binary(&env, "conch-tool"), Some(tool));
    }
}
