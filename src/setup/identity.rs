//! Resolution of the target node's enode address from its data directory.

use std::{
    env, fmt, fs, io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    str::FromStr,
};

use k256::{elliptic_curve::sec1::ToEncodedPoint, SecretKey};
use tracing::*;

/// Location of the node key inside a node's data directory.
pub const NODE_KEY_PATH: &str = "geth/nodekey";

const ENODE_SCHEME: &str = "enode://";

/// Errors while resolving a target's address.
#[derive(Debug)]
pub enum IdentityError {
    /// The node key couldn't be read.
    Io(io::Error),
    /// The node key isn't a valid secp256k1 secret key.
    InvalidKey(String),
    /// An enode URL couldn't be parsed.
    InvalidAddr(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Io(err) => write!(f, "couldn't read the node key: {}", err),
            IdentityError::InvalidKey(reason) => write!(f, "invalid node key: {}", reason),
            IdentityError::InvalidAddr(reason) => write!(f, "invalid enode url: {}", reason),
        }
    }
}

impl std::error::Error for IdentityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IdentityError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for IdentityError {
    fn from(err: io::Error) -> Self {
        IdentityError::Io(err)
    }
}

/// A node's public identity: its uncompressed secp256k1 public key without the SEC1 tag byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId([u8; 64]);

impl NodeId {
    /// Derives the public identity from a hex encoded secret key.
    ///
    /// Surrounding whitespace and a `0x` prefix are accepted.
    pub fn from_secret_hex(secret: &str) -> Result<Self, IdentityError> {
        let secret = secret.trim();
        let bytes = hex::decode(secret.trim_start_matches("0x"))
            .map_err(|err| IdentityError::InvalidKey(err.to_string()))?;

        if bytes.len() != 32 {
            return Err(IdentityError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let secret = SecretKey::from_slice(&bytes)
            .map_err(|err| IdentityError::InvalidKey(err.to_string()))?;
        let point = secret.public_key().to_encoded_point(false);

        let mut id = [0u8; 64];
        id.copy_from_slice(&point.as_bytes()[1..]);

        Ok(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl FromStr for NodeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|err| IdentityError::InvalidAddr(err.to_string()))?;
        let id = <[u8; 64]>::try_from(bytes.as_slice()).map_err(|_| {
            IdentityError::InvalidAddr(format!("node id is {} bytes, not 64", bytes.len()))
        })?;

        Ok(Self(id))
    }
}

/// An enode address: who the node is and where it listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAddr {
    pub id: NodeId,
    pub addr: SocketAddr,
}

impl NodeAddr {
    /// The address of a node listening on `port` on the loopback interface.
    pub fn local(id: NodeId, port: u16) -> Self {
        Self {
            id,
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        }
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Discovery is never used, the target is dialled directly.
        write!(f, "{}{}@{}?discport=0", ENODE_SCHEME, self.id, self.addr)
    }
}

impl FromStr for NodeAddr {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(ENODE_SCHEME)
            .ok_or_else(|| IdentityError::InvalidAddr(format!("missing {} scheme", ENODE_SCHEME)))?;

        // Query parameters only concern discovery.
        let rest = rest.split('?').next().unwrap_or(rest);

        let (id, addr) = rest
            .split_once('@')
            .ok_or_else(|| IdentityError::InvalidAddr("missing '@' separator".to_owned()))?;

        let id = id.parse()?;
        let addr = addr
            .parse()
            .map_err(|err: std::net::AddrParseError| IdentityError::InvalidAddr(err.to_string()))?;

        Ok(Self { id, addr })
    }
}

/// Resolves the address of the target node whose data directory is `data_dir`, relative to the
/// working directory, listening on `port` on the loopback interface.
pub fn resolve_target(data_dir: &Path, port: u16) -> Result<NodeAddr, IdentityError> {
    let key_path = env::current_dir()?.join(data_dir).join(NODE_KEY_PATH);
    let secret = fs::read_to_string(&key_path)?;

    let target = NodeAddr::local(NodeId::from_secret_hex(&secret)?, port);
    // The textual form is what gets logged and dialled, make sure it is well-formed.
    let target = target.to_string().parse::<NodeAddr>()?;
    debug!("resolved target {} from {}", target, key_path.display());

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The secret key `1` maps to the curve's generator point.
    const SECRET_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const GENERATOR: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
                             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    #[test]
    fn public_id_is_the_uncompressed_key_without_tag() {
        let id = NodeId::from_secret_hex(SECRET_ONE).unwrap();
        assert_eq!(id.to_string(), GENERATOR);
    }

    #[test]
    fn trailing_newline_in_key_file_is_ignored() {
        let id = NodeId::from_secret_hex(&format!("{}\n", SECRET_ONE)).unwrap();
        assert_eq!(id.to_string(), GENERATOR);
    }

    #[test]
    fn zero_key_is_rejected() {
        let zero = "00".repeat(32);
        assert!(matches!(
            NodeId::from_secret_hex(&zero),
            Err(IdentityError::InvalidKey(_))
        ));
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(matches!(
            NodeId::from_secret_hex("abcd"),
            Err(IdentityError::InvalidKey(_))
        ));
    }

    #[test]
    fn enode_url_format() {
        let id = NodeId::from_secret_hex(SECRET_ONE).unwrap();
        let addr = NodeAddr::local(id, 30303);

        assert_eq!(
            addr.to_string(),
            format!("enode://{}@127.0.0.1:30303?discport=0", GENERATOR)
        );
        assert_eq!(addr.to_string().parse::<NodeAddr>().unwrap(), addr);
    }

    #[test]
    fn malformed_enode_urls() {
        for url in [
            "127.0.0.1:30303",
            "enode://abcd@127.0.0.1:30303",
            &format!("enode://{}", GENERATOR),
            &format!("enode://{}@localhost", GENERATOR),
        ] {
            assert!(
                matches!(url.parse::<NodeAddr>(), Err(IdentityError::InvalidAddr(_))),
                "{} parsed",
                url
            );
        }
    }
}
