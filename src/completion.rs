//! # Shell Completion Module
//!
//! Static completion scripts come from `clap_complete`. The enhanced bash
//! script adds value completion for `--key` (from `journey complete-keys`)
//! and `--progression`.
//!
//! ```bash
//! journey completion zsh > ~/.config/zsh/completions/_journey
//! journey completion-enhanced > ~/.local/share/bash-completion/completions/journey
//! ```

use crate::cli::Shell;
use crate::track::{CamelotKey, Texture};
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Progression names offered for completion.
pub const PROGRESSION_NAMES: [&str; 3] = ["gradual_build", "peak_and_descent", "steady"];

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// All 24 Camelot codes, 1A through 12B.
#[must_use]
pub fn key_completions() -> Vec<String> {
    let mut codes: Vec<String> = CamelotKey::ALL.iter().map(|k| k.code()).collect();
    codes.sort_by_key(|c| {
        let (number, letter) = c.split_at(c.len() - 1);
        (letter.to_string(), number.parse::<u8>().unwrap_or_default())
    });
    codes
}

/// Print one key code per line
///
/// # Errors
///
/// Fails if stdout is closed.
pub fn print_key_completions(out: &mut impl Write) -> io::Result<()> {
    for code in key_completions() {
        writeln!(out, "{code}")?;
    }
    Ok(())
}

/// Bash script with dynamic key completion.
#[must_use]
pub fn enhanced_bash_completion() -> String {
    let textures: Vec<&str> = Texture::ALL.iter().map(|t| t.as_str()).collect();
    format!(
        r#"#!/bin/bash

_journey_complete_keys() {{
    if command -v journey >/dev/null 2>&1; then
        journey complete-keys 2>/dev/null
    fi
}}

_journey() {{
    local cur prev words cword
    _init_completion || return

    case "${{prev}}" in
        -k|--key)
            mapfile -t COMPREPLY < <(_journey_complete_keys | grep -i "^${{cur}}")
            return 0
            ;;
        -p|--progression)
            COMPREPLY=($(compgen -W "{progressions}" -- "${{cur}}"))
            return 0
            ;;
        -t|--texture)
            COMPREPLY=($(compgen -W "{textures}" -- "${{cur}}"))
            return 0
            ;;
        completion)
            COMPREPLY=($(compgen -W "bash zsh fish power-shell elvish" -- "${{cur}}"))
            return 0
            ;;
        import|export|-o|--output|--library|--config)
            _filedir
            return 0
            ;;
    esac

    local subcommands="import export stats list generate completion completion-enhanced help"

    if [[ $cword -eq 1 ]]; then
        COMPREPLY=($(compgen -W "$subcommands --library --config --help --version" -- "${{cur}}"))
    else
        case "${{words[1]}}" in
            import)
                COMPREPLY=($(compgen -W "--force --help" -- "${{cur}}"))
                ;;
            list)
                COMPREPLY=($(compgen -W "--bpm --key --energy --texture --label --limit --help" -- "${{cur}}"))
                ;;
            generate)
                COMPREPLY=($(compgen -W "--key --min-bpm --max-bpm --progression --blend --strict-key --no-label-preference --seed --alternatives --output --m3u --playback --help" -- "${{cur}}"))
                ;;
            *)
                COMPREPLY=($(compgen -W "$subcommands" -- "${{cur}}"))
                ;;
        esac
    fi
}} &&
complete -F _journey journey
"#,
        progressions = PROGRESSION_NAMES.join(" "),
        textures = textures.join(" "),
    )
}
