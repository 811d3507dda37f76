//! Built-in remediation playbook, one entry per resource type.

use serde_json::json;

use crate::models::ResourceType;
use super::Advice;

pub fn playbook_for(resource_type: ResourceType) -> Advice {
    let (advice, sources): (&str, [&str; 2]) = match resource_type {
        ResourceType::StorageAccount => (
            "1. Immediately rotate Storage Account access keys. 2. Enable 'Secure transfer required' in storage settings. \
             3. Configure virtual network service endpoints to restrict access. 4. Review 'Storage Blob Data Reader' role \
             assignments for unusual service principals.",
            ["Azure Security Benchmark v3", "MITRE ATT&CK T1530"],
        ),
        ResourceType::SqlDb => (
            "1. Temporarily block the source IP at the NSG/firewall level. 2. Enforce Entra-only authentication for the SQL \
             server. 3. Remove 0.0.0.0/0 (Internet) rules from the SQL firewall. 4. Reset passwords for any compromised \
             local SQL accounts.",
            ["CIS Microsoft Azure v2.0", "SQL Security Best Practices"],
        ),
        ResourceType::Identity => (
            "1. Revoke the unauthorized privileged role assignment immediately. 2. Enable Privileged Identity Management for \
             just-in-time role activation. 3. Audit all role assignments made by the assigning principal in the last 24 \
             hours. 4. Enforce MFA for every user with 'User Access Administrator' permissions.",
            ["Azure IAM Hardening Guide", "NIST 800-53"],
        ),
        ResourceType::Vm => (
            "1. Isolate the VM from the network with a deny-all NSG rule. 2. Capture a disk snapshot for forensics. \
             3. Review recent process executions and scheduled tasks for persistence. 4. Enable adaptive application \
             controls and endpoint protection.",
            ["CIS Microsoft Azure v2.0", "MITRE ATT&CK T1059"],
        ),
        ResourceType::AksCluster => (
            "1. Cordon affected nodes and inspect running pods. 2. Remove privileged security contexts and CAP_SYS_ADMIN \
             grants. 3. Enforce pod security admission and network policies. 4. Restrict image sources to a verified \
             registry.",
            ["CIS Kubernetes Benchmark", "MITRE ATT&CK T1611"],
        ),
        ResourceType::KeyVault => (
            "1. Rotate secrets accessed during the suspicious window. 2. Restrict the vault to private endpoints and an IP \
             allowlist. 3. Enable diagnostic logging for all vault operations. 4. Review access policies for unused \
             service principals.",
            ["CIS Microsoft Azure v2.0", "MITRE ATT&CK T1552"],
        ),
        ResourceType::NetworkSecurityGroup => (
            "1. Remove inbound rules that allow Any source on management ports. 2. Use just-in-time VM access for \
             RDP/SSH. 3. Enable NSG flow logs and traffic analytics. 4. Review recent rule changes in the activity log.",
            ["CIS Microsoft Azure v2.0", "Azure Network Security Best Practices"],
        ),
        ResourceType::FunctionApp => (
            "1. Rotate function keys and app settings secrets. 2. Require HTTPS only and a minimum TLS version of 1.2. \
             3. Restrict inbound access with access restrictions or private endpoints. 4. Switch to managed identity \
             for downstream resources.",
            ["Azure Security Benchmark v3", "OWASP Serverless Top 10"],
        ),
    };

    Advice {
        advice: advice.to_string(),
        sources: sources.iter().map(|s| json!({ "source": s })).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_resource_type_has_guidance() {
        let all = [
            ResourceType::Vm,
            ResourceType::StorageAccount,
            ResourceType::SqlDb,
            ResourceType::AksCluster,
            ResourceType::KeyVault,
            ResourceType::NetworkSecurityGroup,
            ResourceType::Identity,
            ResourceType::FunctionApp,
        ];
        for rt in all {
            let advice = playbook_for(rt);
            assert!(advice.advice.starts_with("1. "), "{:?}", rt);
            assert_eq!(advice.sources.len(), 2);
            assert!(advice.sources[0]["source"].is_string());
        }
    }
}
