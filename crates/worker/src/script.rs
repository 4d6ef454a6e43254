//! Entry script generation.

/// File name of the entry script inside a sandbox build context.
pub const ENTRY_SCRIPT_NAME: &str = "entry.sh";

const ENTRY_SCRIPT_HEADER: &str = "#!/bin/sh\n# auto generated. Don't edit\nset -e\n";

/// Renders a job's commands as a POSIX shell script that stops at the first
/// failing command.
pub fn render_entry_script<S: AsRef<str>>(commands: &[S]) -> String {
    let mut script = String::from(ENTRY_SCRIPT_HEADER);
    for command in commands {
        script.push_str(command.as_ref());
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_entry_script() {
        let script = render_entry_script(&["make build", "make test"]);
        assert_eq!(
            script,
            "#!/bin/sh\n# auto generated. Don't edit\nset -e\nmake build\nmake test\n"
        );
    }

    #[test]
    fn test_render_empty_script_keeps_header() {
        let script = render_entry_script::<String>(&[]);
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.ends_with("set -e\n"));
    }
}
