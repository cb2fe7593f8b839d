/*!

Renders the ignition config that boots CoreOS-family guests. The user data is stored in the
install directory, the hostname is set and the `core` user gets the SSH keys.

!*/

use serde_json::Value;

/// The values that are filled into the ignition template.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IgnitionConfig {
    pub passwd_hash: String,
    pub hostname: String,
    pub ssh_keys: Vec<String>,
    pub userdata_base64: String,
    pub install_path: String,
}

/// Renders the ignition 2.1.0 config for `config`.
pub fn ignition_file(config: &IgnitionConfig) -> String {
    let ssh_keys = config
        .ssh_keys
        .iter()
        .map(|key| format!("\"{}\"", escape(key)))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        concat!(
            "{{\n",
            r#"  "ignition": {{"config":{{}},"timeouts":{{}},"version":"2.1.0"}},"#,
            "\n",
            r#"  "networkd":{{"units":[{{"contents":"[Match]\nName=ens192\n\n[Network]\nDHCP=yes\nLinkLocalAddressing=no\nIPv6AcceptRA=no\n","name":"00-ens192.network"}}]}},"#,
            "\n",
            r#"  "passwd":{{"users":[{{"name":"core","passwordHash":"{passwd_hash}","sshAuthorizedKeys":[{ssh_keys}]}}]}},"#,
            "\n",
            r#"  "storage": {{"#,
            "\n\t",
            r#""directories":[{{"filesystem":"root","path":"{install_path}","mode":493}}],"#,
            "\n\t",
            r#""files":["#,
            "\n\t",
            r#"  {{"filesystem":"root","path":"/etc/hostname","contents":{{"source":"data:,{hostname}"}},"mode":420}},"#,
            "\n\t",
            r#"  {{"filesystem":"root","path":"{install_path}/user_data","contents":{{"source":"data:text/plain;charset=utf-8;base64,{userdata_base64}"}},"mode":420}}"#,
            "\n\t]\n",
            "  }},\n",
            r#"  "systemd":{{}}"#,
            "\n}}\n",
        ),
        passwd_hash = escape(&config.passwd_hash),
        ssh_keys = ssh_keys,
        install_path = escape(&config.install_path),
        hostname = escape(&config.hostname),
        userdata_base64 = escape(&config.userdata_base64),
    )
}

/// `value` as the content of a JSON string.
fn escape(value: &str) -> String {
    let quoted = Value::from(value).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
