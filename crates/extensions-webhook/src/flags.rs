//! Command-line flag helpers
//!
//! Flags are identified by their `--flag=` prefix. Comma-joined flags such as
//! `--feature-gates=` or `--enable-admission-plugins=` are merged token by
//! token, where a token's identity is the part before `=` (`Foo=true` and
//! `Foo=false` are the same token).

/// Index of the first element starting with `prefix`
pub fn string_with_prefix_index(items: &[String], prefix: &str) -> Option<usize> {
    items.iter().position(|s| s.starts_with(prefix))
}

/// Set `prefix + value`, replacing the first element with `prefix` in place
pub fn ensure_string_with_prefix(items: &mut Vec<String>, prefix: &str, value: &str) {
    let flag = format!("{prefix}{value}");
    match string_with_prefix_index(items, prefix) {
        Some(i) => items[i] = flag,
        None => items.push(flag),
    }
}

fn token_key(token: &str) -> &str {
    token.split_once('=').map_or(token, |(key, _)| key)
}

fn split_tokens<'a>(list: &'a str, sep: &str) -> Vec<&'a str> {
    list.split(sep).filter(|t| !t.is_empty()).collect()
}

/// Make the `prefix` element's `sep`-joined list contain `value`
///
/// A token with the same key is overwritten where it stands; otherwise
/// `value` is appended. A missing flag is added as `prefix + value`.
pub fn ensure_string_with_prefix_contains(
    items: &mut Vec<String>,
    prefix: &str,
    value: &str,
    sep: &str,
) {
    let Some(i) = string_with_prefix_index(items, prefix) else {
        items.push(format!("{prefix}{value}"));
        return;
    };

    let mut tokens = split_tokens(&items[i][prefix.len()..], sep);
    let key = token_key(value);
    match tokens.iter().position(|t| token_key(t) == key) {
        Some(j) => tokens[j] = value,
        None => tokens.push(value),
    }
    let merged = format!("{prefix}{}", tokens.join(sep));
    items[i] = merged;
}

/// Remove `value` (matched by key) from the `prefix` element's list
///
/// The flag itself stays, possibly with an empty list.
pub fn ensure_no_string_with_prefix_contains(
    items: &mut [String],
    prefix: &str,
    value: &str,
    sep: &str,
) {
    let Some(i) = string_with_prefix_index(items, prefix) else {
        return;
    };
    let key = token_key(value);
    let tokens: Vec<&str> = split_tokens(&items[i][prefix.len()..], sep)
        .into_iter()
        .filter(|t| token_key(t) != key)
        .collect();
    let remaining = format!("{prefix}{}", tokens.join(sep));
    items[i] = remaining;
}

/// Whether the `prefix` element's list contains `value` exactly
pub fn string_with_prefix_contains(items: &[String], prefix: &str, value: &str, sep: &str) -> bool {
    string_with_prefix_index(items, prefix)
        .map(|i| split_tokens(&items[i][prefix.len()..], sep).contains(&value))
        .unwrap_or(false)
}

/// Split a systemd `ExecStart` value into arguments
///
/// Line continuations (`\` followed by a newline) are dropped.
pub fn deserialize_command_line(command: &str) -> Vec<String> {
    command
        .split_whitespace()
        .filter(|arg| *arg != "\\")
        .map(str::to_string)
        .collect()
}

/// Join arguments into a systemd `ExecStart` value
///
/// The first `n` arguments share the first line; each remaining argument is
/// preceded by `sep`.
pub fn serialize_command_line(command: &[String], n: usize, sep: &str) -> String {
    let n = n.min(command.len());
    let mut line = command[..n].join(" ");
    for arg in &command[n..] {
        line.push_str(sep);
        line.push_str(arg);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prefix_flag_is_replaced_or_appended() {
        let mut cmd = strings(&["/hyperkube", "--cloud-provider=?", "--v=2"]);
        ensure_string_with_prefix(&mut cmd, "--cloud-provider=", "external");
        assert_eq!(cmd, strings(&["/hyperkube", "--cloud-provider=external", "--v=2"]));

        ensure_string_with_prefix(&mut cmd, "--cloud-config=", "/etc/cloud.conf");
        assert_eq!(cmd.last().unwrap(), "--cloud-config=/etc/cloud.conf");
    }

    #[test]
    fn story_feature_gates_merge_without_duplicates() {
        let mut cmd = strings(&["--feature-gates=Foo=true"]);
        ensure_string_with_prefix_contains(&mut cmd, "--feature-gates=", "CSINodeInfo=true", ",");
        ensure_string_with_prefix_contains(&mut cmd, "--feature-gates=", "CSINodeInfo=true", ",");
        assert_eq!(cmd, strings(&["--feature-gates=Foo=true,CSINodeInfo=true"]));

        // Same key, new value: overwritten where it stands
        ensure_string_with_prefix_contains(&mut cmd, "--feature-gates=", "Foo=false", ",");
        assert_eq!(cmd, strings(&["--feature-gates=Foo=false,CSINodeInfo=true"]));
    }

    #[test]
    fn story_admission_plugins_move_between_lists() {
        let mut cmd = strings(&[
            "--enable-admission-plugins=Priority,PersistentVolumeLabel",
            "--disable-admission-plugins=",
        ]);
        ensure_no_string_with_prefix_contains(
            &mut cmd,
            "--enable-admission-plugins=",
            "PersistentVolumeLabel",
            ",",
        );
        ensure_string_with_prefix_contains(
            &mut cmd,
            "--disable-admission-plugins=",
            "PersistentVolumeLabel",
            ",",
        );
        assert_eq!(
            cmd,
            strings(&[
                "--enable-admission-plugins=Priority",
                "--disable-admission-plugins=PersistentVolumeLabel",
            ])
        );
        assert!(!string_with_prefix_contains(
            &cmd,
            "--enable-admission-plugins=",
            "PersistentVolumeLabel",
            ","
        ));
    }

    #[test]
    fn removing_last_token_keeps_the_flag() {
        let mut cmd = strings(&["--enable-admission-plugins=PersistentVolumeLabel"]);
        ensure_no_string_with_prefix_contains(
            &mut cmd,
            "--enable-admission-plugins=",
            "PersistentVolumeLabel",
            ",",
        );
        assert_eq!(cmd, strings(&["--enable-admission-plugins="]));

        let mut missing = strings(&["--v=2"]);
        ensure_no_string_with_prefix_contains(&mut missing, "--feature-gates=", "Foo", ",");
        assert_eq!(missing, strings(&["--v=2"]));
    }

    #[test]
    fn missing_list_flag_is_created() {
        let mut cmd = Vec::new();
        ensure_string_with_prefix_contains(&mut cmd, "--feature-gates=", "Foo=true", ",");
        assert_eq!(cmd, strings(&["--feature-gates=Foo=true"]));
    }

    #[test]
    fn command_line_round_trip() {
        let value = "/opt/bin/hyperkube kubelet \\\n    --config=/var/lib/kubelet/config/kubelet";
        let args = deserialize_command_line(value);
        assert_eq!(
            args,
            strings(&[
                "/opt/bin/hyperkube",
                "kubelet",
                "--config=/var/lib/kubelet/config/kubelet"
            ])
        );
        assert_eq!(serialize_command_line(&args, 2, " \\\n    "), value);
    }

    #[test]
    fn serialize_handles_short_commands() {
        assert_eq!(serialize_command_line(&strings(&["kubelet"]), 2, " \\\n    "), "kubelet");
        assert_eq!(serialize_command_line(&[], 2, " \\\n    "), "");
    }
}
