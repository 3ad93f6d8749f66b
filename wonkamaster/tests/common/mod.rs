//! Shared fixtures: an authority, in-memory collaborators and real OpenSSH
//! certificate authorities.

#![allow(dead_code)]

use std::sync::Arc;

use rand::rngs::OsRng;
use ssh_key::PrivateKey;
use ssh_key::certificate::{Builder, CertType};
use ssh_key::private::{Ed25519Keypair, Ed25519PrivateKey, KeypairData};
use ssh_key::public::{Ed25519PublicKey, KeyData};
use wonka::{Certificate, Entity, EntityType, SigningKey};
use wonka_directory::{MemoryEntityStore, MemoryGroupDirectory};
use wonkamaster::{
    ClaimEngine, ClaimVerifier, Clock, CsrEngine, FixedClock, OpenSshTrust, PolicyConfig,
    SystemClock,
};

pub const HOST: &str = "h1.prod.uber.internal";

/// Routes engine logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An OpenSSH certificate authority.
pub struct SshCa {
    key: PrivateKey,
}

impl SshCa {
    pub fn new(comment: &str) -> Self {
        let seed = SigningKey::generate();
        let keypair = KeypairData::Ed25519(Ed25519Keypair {
            public: Ed25519PublicKey(seed.verifying_key().to_bytes()),
            private: Ed25519PrivateKey::from_bytes(&seed.to_bytes()),
        });
        Self {
            key: PrivateKey::new(keypair, comment).unwrap(),
        }
    }

    pub fn line(&self) -> String {
        self.key.public_key().to_openssh().unwrap()
    }

    /// Issues a certificate for `subject`, valid for an hour either side of `now`.
    pub fn issue(&self, subject: &SigningKey, kind: CertType, principal: &str, now: i64) -> String {
        let data = KeyData::Ed25519(Ed25519PublicKey(subject.verifying_key().to_bytes()));
        let mut builder = Builder::new_with_random_nonce(
            &mut OsRng,
            data,
            u64::try_from(now - 3_600).unwrap(),
            u64::try_from(now + 3_600).unwrap(),
        )
        .unwrap();
        builder.serial(1).unwrap();
        builder.key_id(principal).unwrap();
        builder.cert_type(kind).unwrap();
        builder.valid_principal(principal).unwrap();
        builder.sign(&self.key).unwrap().to_openssh().unwrap()
    }
}

/// A complete deployment: one authority, both engines and their collaborators.
pub struct World {
    pub authority: SigningKey,
    pub config: Arc<PolicyConfig>,
    pub store: Arc<MemoryEntityStore>,
    pub directory: Arc<MemoryGroupDirectory>,
    pub user_ca: SshCa,
    pub host_ca: SshCa,
    pub clock: Arc<FixedClock>,
    pub csr: CsrEngine,
    pub claims: ClaimEngine,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Builds a world whose policy is adjusted by `configure`. The clock
    /// starts at real time so issued PASETO tokens are not already expired.
    pub fn with_config(configure: impl FnOnce(PolicyConfig) -> PolicyConfig) -> Self {
        init_tracing();
        let authority = SigningKey::generate();
        let config = Arc::new(configure(PolicyConfig::new(authority.clone())));
        let store = Arc::new(MemoryEntityStore::with_defaults());
        let directory = Arc::new(MemoryGroupDirectory::new().with_member("alice", "x-men"));
        let user_ca = SshCa::new("user-ca");
        let host_ca = SshCa::new("host-ca");
        let trust = Arc::new(
            OpenSshTrust::from_openssh_keys(&[user_ca.line()], &[host_ca.line()]).unwrap(),
        );
        let clock = Arc::new(FixedClock::new(SystemClock.now()));

        let csr = CsrEngine::new(config.clone(), store.clone(), trust.clone(), clock.clone());
        let claims = ClaimEngine::new(
            config.clone(),
            store.clone(),
            directory.clone(),
            trust,
            clock.clone(),
        );
        Self {
            authority,
            config,
            store,
            directory,
            user_ca,
            host_ca,
            clock,
            csr,
            claims,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn at(&self, offset: i64) -> u64 {
        u64::try_from(self.now() + offset).unwrap()
    }

    pub fn verifier(&self) -> ClaimVerifier {
        ClaimVerifier::new(vec![self.authority.verifying_key()])
    }

    pub fn enroll(&self, name: &str) -> SigningKey {
        let key = SigningKey::generate();
        self.store.put(Entity::new(name, &key.verifying_key())).unwrap();
        key
    }

    pub fn host_cert(&self, key: &SigningKey, principal: &str) -> String {
        self.host_ca.issue(key, CertType::Host, principal, self.now())
    }

    pub fn user_cert(&self, key: &SigningKey, principal: &str) -> String {
        self.user_ca.issue(key, CertType::User, principal, self.now())
    }

    /// An unsigned service certificate valid from now for an hour.
    pub fn certificate(&self, holder: &SigningKey, name: &str, host: &str) -> Certificate {
        Certificate::new(
            name,
            EntityType::Service,
            host,
            &holder.verifying_key(),
            self.at(0),
            self.at(3_600),
        )
    }

    /// A service certificate signed by the authority.
    pub fn issued(&self, holder: &SigningKey, name: &str) -> Certificate {
        let mut cert = self.certificate(holder, name, HOST);
        cert.sign(&self.authority).unwrap();
        cert
    }
}
