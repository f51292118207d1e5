use anyhow::{anyhow, bail};
use clap::{ArgGroup, Subcommand};
use fabric_ca_client::{
    api::{Attribute, EnrollmentRequest, GenerateCrlRequest, RegistrationRequest, RevokeOptions},
    FabricCaClient,
};
use fabric_sdk::identity::User;
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio_util::sync::CancellationToken;

use crate::storage::EnrollmentStore;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the CA name, certificate chain and server version.
    Cainfo,
    /// Enroll an identity and store its key and certificate.
    Enroll {
        name: String,
        secret: String,
        #[clap(long)]
        profile: Option<String>,
        #[clap(long)]
        label: Option<String>,
        /// Subject alternative name for the certificate.
        #[clap(long = "host")]
        hosts: Vec<String>,
        /// Attribute to include in the certificate. Suffix with `?` to make
        /// it optional.
        #[clap(long = "attr")]
        attributes: Vec<String>,
    },
    /// Renew the stored certificate of an identity.
    Reenroll {
        name: String,
        /// Generate a new key pair instead of keeping the current one.
        #[clap(long)]
        new_key: bool,
    },
    /// Register a new identity and print its enrollment secret.
    Register {
        /// Stored identity acting as registrar.
        #[clap(long = "as")]
        registrar: String,
        enrollment_id: String,
        #[clap(long)]
        secret: Option<String>,
        #[clap(long = "type")]
        identity_type: Option<String>,
        #[clap(long)]
        affiliation: Option<String>,
        #[clap(long)]
        max_enrollments: Option<i32>,
        /// Attribute as `name=value`, or `name=value:ecert` to put it in
        /// enrollment certificates by default.
        #[clap(long = "attr")]
        attributes: Vec<String>,
    },
    /// Revoke an identity, one of its certificates, or a stored enrollment.
    #[clap(group(ArgGroup::new("target").required(true).args(&["id", "serial", "enrollment"])))]
    Revoke {
        /// Stored identity acting as revoker.
        #[clap(long = "as")]
        revoker: String,
        /// Revoke every certificate of this identity.
        #[clap(long)]
        id: Option<String>,
        /// Serial number of the certificate to revoke.
        #[clap(long, requires = "aki")]
        serial: Option<String>,
        /// Authority key identifier of the certificate to revoke.
        #[clap(long, requires = "serial")]
        aki: Option<String>,
        /// Stored identity whose certificate is revoked.
        #[clap(long)]
        enrollment: Option<String>,
        #[clap(long)]
        reason: Option<String>,
        /// Print the CRL generated after revocation.
        #[clap(long)]
        gencrl: bool,
    },
    /// Generate a certificate revocation list. Times are RFC 3339.
    Gencrl {
        #[clap(long = "as")]
        registrar: String,
        #[clap(long, value_parser = parse_time)]
        revoked_before: Option<OffsetDateTime>,
        #[clap(long, value_parser = parse_time)]
        revoked_after: Option<OffsetDateTime>,
        #[clap(long, value_parser = parse_time)]
        expire_before: Option<OffsetDateTime>,
        #[clap(long, value_parser = parse_time)]
        expire_after: Option<OffsetDateTime>,
    },
    /// List the identities visible to a registrar.
    Identities {
        #[clap(long = "as")]
        registrar: String,
    },
    /// Show the affiliation tree visible to a registrar.
    Affiliations {
        #[clap(long = "as")]
        registrar: String,
    },
}

impl Command {
    pub async fn execute(
        self,
        client: &FabricCaClient,
        store: &EnrollmentStore,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        match self {
            Command::Cainfo => {
                let info = client.info(cancel).await?;
                println!("{}", serde_json::to_string_pretty(&info)?);
            }
            Command::Enroll {
                name,
                secret,
                profile,
                label,
                hosts,
                attributes,
            } => {
                let mut request = EnrollmentRequest::default().with_hosts(hosts);
                if let Some(profile) = profile {
                    request = request.with_profile(profile);
                }
                if let Some(label) = label {
                    request = request.with_label(label);
                }
                for attribute in attributes {
                    request = match attribute.strip_suffix('?') {
                        Some(name) => request.add_attribute_request(name, true),
                        None => request.add_attribute_request(attribute, false),
                    };
                }

                let enrollment = client.enroll(&name, &secret, request, cancel).await?;
                store.save(&name, &enrollment)?;
                println!("Enrolled {name}");
            }
            Command::Reenroll { name, new_key } => {
                let user = store.load_user(&name)?;
                let mut request = EnrollmentRequest::default();
                if new_key {
                    request = request.with_key(client.crypto_suite().key_gen()?);
                }

                let enrollment = client.reenroll(&user, request, cancel).await?;
                store.save(user.name(), &enrollment)?;
                println!("Reenrolled {name}");
            }
            Command::Register {
                registrar,
                enrollment_id,
                secret,
                identity_type,
                affiliation,
                max_enrollments,
                attributes,
            } => {
                let registrar = store.load_user(&registrar)?;
                let mut request = RegistrationRequest::new(enrollment_id);
                if let Some(secret) = secret {
                    request = request.with_secret(secret);
                }
                if let Some(identity_type) = identity_type {
                    request = request.with_identity_type(identity_type);
                }
                if let Some(affiliation) = affiliation {
                    request = request.with_affiliation(affiliation);
                }
                if let Some(max_enrollments) = max_enrollments {
                    request = request.with_max_enrollments(max_enrollments);
                }
                for attribute in attributes {
                    request = request.add_attribute(parse_attribute(&attribute)?);
                }

                let secret = client.register(&request, &registrar, cancel).await?;
                println!("{secret}");
            }
            Command::Revoke {
                revoker,
                id,
                serial,
                aki,
                enrollment,
                reason,
                gencrl,
            } => {
                let revoker = store.load_user(&revoker)?;
                let mut options = RevokeOptions::default();
                if let Some(reason) = reason {
                    options = options.with_reason(reason);
                }
                if gencrl {
                    options = options.with_crl();
                }

                let response = match (id, serial, aki, enrollment) {
                    (Some(id), _, _, _) => {
                        client
                            .revoke_identity(&revoker, &id, &options, cancel)
                            .await?
                    }
                    (_, Some(serial), Some(aki), _) => {
                        client
                            .revoke_certificate(&revoker, &serial, &aki, &options, cancel)
                            .await?
                    }
                    (_, _, _, Some(name)) => {
                        let enrollment = store.load_enrollment(&name)?;
                        client
                            .revoke_enrollment(&revoker, &enrollment, &options, cancel)
                            .await?
                    }
                    _ => bail!("Nothing to revoke"),
                };
                match response.crl {
                    Some(crl) => println!("{crl}"),
                    None => println!("Revoked"),
                }
            }
            Command::Gencrl {
                registrar,
                revoked_before,
                revoked_after,
                expire_before,
                expire_after,
            } => {
                let registrar = store.load_user(&registrar)?;
                let request = GenerateCrlRequest {
                    revoked_before,
                    revoked_after,
                    expire_before,
                    expire_after,
                };
                let crl = client.generate_crl(&registrar, &request, cancel).await?;
                println!("{crl}");
            }
            Command::Identities { registrar } => {
                let registrar = store.load_user(&registrar)?;
                let identities = client.identities(&registrar, cancel).await?;
                println!("{}", serde_json::to_string_pretty(&identities)?);
            }
            Command::Affiliations { registrar } => {
                let registrar = store.load_user(&registrar)?;
                let affiliations = client.affiliations(&registrar, cancel).await?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "tree": &affiliations,
                        "names": affiliations.descendant_names(),
                    }))?
                );
            }
        }
        Ok(())
    }
}

fn parse_time(value: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(value, &Rfc3339)
}

/// Parse `name=value` or `name=value:ecert`.
fn parse_attribute(value: &str) -> anyhow::Result<Attribute> {
    let (name, value) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("Attribute {value} is not of the form name=value"))?;
    if name.is_empty() {
        bail!("Attribute name must not be empty");
    }
    Ok(match value.strip_suffix(":ecert") {
        Some(value) => Attribute::new(name, value).in_ecert(),
        None => Attribute::new(name, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use time::macros::datetime;

    #[test]
    fn attributes_parse_with_and_without_ecert() {
        let attribute = parse_attribute("hf.Revoker=true").unwrap();
        assert_eq!(attribute, Attribute::new("hf.Revoker", "true"));

        let attribute = parse_attribute("app.role=admin:ecert").unwrap();
        assert_eq!(attribute, Attribute::new("app.role", "admin").in_ecert());

        assert!(parse_attribute("no-value").is_err());
        assert!(parse_attribute("=value").is_err());
    }

    #[test]
    fn gencrl_times_parse_as_rfc3339() {
        let cli = Cli::parse_from([
            "fabric-ca-client-cli",
            "--url",
            "http://localhost:7054",
            "gencrl",
            "--as",
            "admin",
            "--revoked-after",
            "2023-01-01T00:00:00Z",
        ]);
        match cli.command {
            Command::Gencrl {
                registrar,
                revoked_after,
                revoked_before,
                ..
            } => {
                assert_eq!(registrar, "admin");
                assert_eq!(revoked_after, Some(datetime!(2023-01-01 0:00 UTC)));
                assert_eq!(revoked_before, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn revoke_needs_a_target() {
        let result = Cli::try_parse_from([
            "fabric-ca-client-cli",
            "--url",
            "http://localhost:7054",
            "revoke",
            "--as",
            "admin",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "fabric-ca-client-cli",
            "--url",
            "http://localhost:7054",
            "revoke",
            "--as",
            "admin",
            "--serial",
            "1a2b",
        ]);
        assert!(result.is_err());
    }
}
