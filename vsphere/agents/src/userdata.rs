/*!

Prepares the user data that cloud-init reads from the `guestinfo.userdata` property of a VM.

!*/

use crate::error::{self, Result};
use agent_utils::base64_encode;
use snafu::ensure;

const SSH_KEYS_KEY: &str = "ssh_authorized_keys:";

/// Turns the machine's user data into a cloud-config with the SSH keys. A shell script is first
/// wrapped into a cloud-config that runs it once.
pub fn prepare_user_data(user_data: &str, ssh_keys: &[String]) -> Result<String> {
    let user_data = if user_data.starts_with("#!/") {
        package_in_cloud_init(user_data)
    } else {
        user_data.to_string()
    };
    add_ssh_keys_section(&user_data, ssh_keys)
}

/// A cloud-config that writes `script` to `/root/cloud-init-script`, runs it and removes it.
pub fn package_in_cloud_init(script: &str) -> String {
    format!(
        "#cloud-config\n\
         \n\
         write_files:\n\
         - encoding: b64\n\
         \x20 content: {}\n\
         \x20 owner: root:root\n\
         \x20 path: /root/cloud-init-script\n\
         \x20 permissions: '0555'\n\
         \n\
         runcmd:\n\
         - /root/cloud-init-script\n\
         - rm /root/cloud-init-script\n",
        base64_encode(script)
    )
}

/// Appends an `ssh_authorized_keys` section. User data that already has one is rejected.
pub fn add_ssh_keys_section(user_data: &str, ssh_keys: &[String]) -> Result<String> {
    if ssh_keys.is_empty() {
        return Ok(user_data.to_string());
    }
    ensure!(!user_data.contains(SSH_KEYS_KEY), error::SshKeysPresentSnafu);

    let mut result = String::with_capacity(user_data.len() + 32 * ssh_keys.len());
    result.push_str(user_data);
    result.push('\n');
    result.push_str(SSH_KEYS_KEY);
    result.push('\n');
    for key in ssh_keys {
        result.push_str("- ");
        result.push_str(&serde_json::Value::from(key.as_str()).to_string());
        result.push('\n');
    }
    Ok(result)
}
