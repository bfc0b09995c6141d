//! Attack scripts: the TOML description of what to do once the target is synced.
//!
//! A script is an array of `[[action]]` tables, each tagged by its `kind`:
//!
//! ```toml
//! [[action]]
//! kind = "send_transactions"
//! transactions = ["0xdeadbeef"]
//!
//! [[action]]
//! kind = "send_block"
//! parent = 12           # defaults to the head
//! transactions = []
//! extra = "0x00"
//! difficulty = 1000000  # defaults to the configured declared difficulty
//!
//! [[action]]
//! kind = "sleep"
//! millis = 500
//!
//! [[action]]
//! kind = "terminate"
//! ```

use std::{fmt, fs, io, path::Path, time::Duration};

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::*;

use crate::{
    chain::ChainAccessor,
    protocol::payload::{deserialize_hex, Block, Transaction},
    session::Action,
};

const KINDS: [&str; 4] = ["send_transactions", "send_block", "sleep", "terminate"];

/// Errors while loading an attack script.
#[derive(Debug)]
pub enum ScriptError {
    Io(io::Error),
    /// The script isn't valid TOML.
    Parse(String),
    /// An action has no `kind`.
    MissingKind { index: usize },
    UnrecognizedAction { index: usize, kind: String },
    /// An action's fields don't match its kind.
    InvalidAction { index: usize, reason: String },
    /// A block was requested on top of a height the chain doesn't hold.
    UnknownParent { index: usize, number: u64 },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Io(err) => write!(f, "couldn't read the script: {}", err),
            ScriptError::Parse(reason) => write!(f, "malformed script: {}", reason),
            ScriptError::MissingKind { index } => write!(f, "action #{} has no kind", index),
            ScriptError::UnrecognizedAction { index, kind } => {
                write!(f, "action #{}: unrecognized action {:?}", index, kind)
            }
            ScriptError::InvalidAction { index, reason } => {
                write!(f, "action #{}: {}", index, reason)
            }
            ScriptError::UnknownParent { index, number } => {
                write!(f, "action #{}: no block at height {} to build on", index, number)
            }
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScriptError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ScriptError {
    fn from(err: io::Error) -> Self {
        ScriptError::Io(err)
    }
}

#[derive(Deserialize)]
struct ScriptFile {
    #[serde(default)]
    action: Vec<toml::value::Table>,
}

#[derive(Deserialize, Default)]
struct HexBytes(#[serde(deserialize_with = "deserialize_hex")] Vec<u8>);

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Step {
    SendTransactions {
        #[serde(default)]
        transactions: Vec<HexBytes>,
    },
    SendBlock {
        parent: Option<u64>,
        #[serde(default)]
        transactions: Vec<HexBytes>,
        #[serde(default)]
        extra: HexBytes,
        difficulty: Option<u64>,
    },
    Sleep {
        millis: u64,
    },
    Terminate,
}

fn into_transactions(raw: Vec<HexBytes>) -> Vec<Transaction> {
    raw.into_iter().map(|bytes| Transaction::new(bytes.0)).collect()
}

/// A parsed attack script, its blocks already built against the served chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackScript {
    actions: Vec<Action>,
}

impl AttackScript {
    pub fn load<P: AsRef<Path>, C: ChainAccessor>(
        path: P,
        chain: &C,
    ) -> Result<Self, ScriptError> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source, chain)
    }

    /// Parses a script, blocks are built on top of headers from `chain`.
    pub fn parse<C: ChainAccessor>(source: &str, chain: &C) -> Result<Self, ScriptError> {
        let file: ScriptFile =
            toml::from_str(source).map_err(|err| ScriptError::Parse(err.to_string()))?;

        let mut actions = Vec::with_capacity(file.action.len());
        for (index, table) in file.action.into_iter().enumerate() {
            let kind = match table.get("kind").and_then(toml::Value::as_str) {
                Some(kind) => kind,
                None => return Err(ScriptError::MissingKind { index }),
            };
            if !KINDS.contains(&kind) {
                return Err(ScriptError::UnrecognizedAction {
                    index,
                    kind: kind.to_owned(),
                });
            }

            let step: Step = toml::Value::Table(table)
                .try_into()
                .map_err(|err: toml::de::Error| ScriptError::InvalidAction {
                    index,
                    reason: err.to_string(),
                })?;

            actions.push(Self::build(index, step, chain)?);
        }

        Ok(Self { actions })
    }

    fn build<C: ChainAccessor>(
        index: usize,
        step: Step,
        chain: &C,
    ) -> Result<Action, ScriptError> {
        let action = match step {
            Step::SendTransactions { transactions } => {
                Action::SendTransactions(into_transactions(transactions))
            }
            Step::SendBlock {
                parent,
                transactions,
                extra,
                difficulty,
            } => {
                let number = parent.unwrap_or_else(|| chain.current_head_height());
                let parent = chain
                    .header_by_number(number)
                    .ok_or(ScriptError::UnknownParent { index, number })?;

                Action::SendBlock {
                    block: Box::new(Block::child_of(
                        parent,
                        into_transactions(transactions),
                        extra.0,
                    )),
                    difficulty: difficulty.map(u128::from),
                }
            }
            Step::Sleep { millis } => Action::Sleep(Duration::from_millis(millis)),
            Step::Terminate => Action::Terminate,
        };

        Ok(action)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Feeds the actions to a bounded queue from a background task.
    ///
    /// The queue holds a single action: the next one is only produced once the session takes the
    /// previous one. It closes after the last action, or early if the receiver goes away.
    pub fn spawn_feeder(self) -> mpsc::Receiver<Action> {
        let (sender, receiver) = mpsc::channel(1);

        tokio::spawn(async move {
            let total = self.actions.len();
            for (fed, action) in self.actions.into_iter().enumerate() {
                if sender.send(action).await.is_err() {
                    debug!("action queue closed after {} of {} actions", fed, total);
                    return;
                }
            }
            debug!("fed all {} actions", total);
        });

        receiver
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::chain::{generate_blocks, MemoryChain};

    fn chain() -> MemoryChain {
        MemoryChain::from_blocks(1, generate_blocks(4)).unwrap()
    }

    #[test]
    fn parses_every_kind() {
        let chain = chain();
        let script = AttackScript::parse(
            r#"
            [[action]]
            kind = "send_transactions"
            transactions = ["0xdead", "beef"]

            [[action]]
            kind = "send_block"
            extra = "0x01"
            difficulty = 5000

            [[action]]
            kind = "sleep"
            millis = 250

            [[action]]
            kind = "terminate"
            "#,
            &chain,
        )
        .unwrap();

        let actions = script.actions();
        assert_eq!(actions.len(), 4);
        assert_eq!(
            actions[0],
            Action::SendTransactions(vec![
                Transaction::new(vec![0xde, 0xad]),
                Transaction::new(vec![0xbe, 0xef]),
            ])
        );
        assert_matches!(&actions[1], Action::SendBlock { block, difficulty: Some(5000) } => {
            assert_eq!(block.header.parent_hash, chain.head().hash());
            assert_eq!(block.number(), 4);
            assert_eq!(block.header.extra_data.0, vec![1]);
        });
        assert_eq!(actions[2], Action::Sleep(Duration::from_millis(250)));
        assert_eq!(actions[3], Action::Terminate);
    }

    #[test]
    fn block_on_explicit_parent_without_difficulty() {
        let chain = chain();
        let script = AttackScript::parse(
            r#"
            [[action]]
            kind = "send_block"
            parent = 1
            "#,
            &chain,
        )
        .unwrap();

        assert_matches!(&script.actions()[0], Action::SendBlock { block, difficulty: None } => {
            assert_eq!(block.number(), 2);
            assert_eq!(block.header.parent_hash, chain.header_by_number(1).unwrap().hash());
            assert!(block.body.transactions.is_empty());
        });
    }

    #[test]
    fn empty_script_has_no_actions() {
        let script = AttackScript::parse("", &chain()).unwrap();
        assert!(script.actions().is_empty());
    }

    #[test]
    fn unrecognized_action_is_rejected() {
        let err = AttackScript::parse(
            r#"
            [[action]]
            kind = "sleep"
            millis = 1

            [[action]]
            kind = "eclipse"
            "#,
            &chain(),
        )
        .unwrap_err();

        assert_matches!(
            err,
            ScriptError::UnrecognizedAction { index: 1, kind } if kind == "eclipse"
        );
    }

    #[test]
    fn missing_kind_is_rejected() {
        let err = AttackScript::parse("[[action]]\nmillis = 1", &chain()).unwrap_err();
        assert_matches!(err, ScriptError::MissingKind { index: 0 });
    }

    #[test]
    fn missing_field_is_rejected() {
        let err = AttackScript::parse("[[action]]\nkind = \"sleep\"", &chain()).unwrap_err();
        assert_matches!(err, ScriptError::InvalidAction { index: 0, .. });
    }

    #[test]
    fn bad_hex_is_rejected() {
        let err = AttackScript::parse(
            "[[action]]\nkind = \"send_transactions\"\ntransactions = [\"0xzz\"]",
            &chain(),
        )
        .unwrap_err();
        assert_matches!(err, ScriptError::InvalidAction { index: 0, .. });
    }

    #[test]
    fn parent_past_the_head_is_rejected() {
        let err =
            AttackScript::parse("[[action]]\nkind = \"send_block\"\nparent = 9", &chain())
                .unwrap_err();
        assert_matches!(err, ScriptError::UnknownParent { index: 0, number: 9 });
    }

    #[tokio::test]
    async fn feeder_preserves_order_and_closes() {
        let script = AttackScript {
            actions: vec![
                Action::Sleep(Duration::from_millis(1)),
                Action::SendTransactions(vec![]),
                Action::Terminate,
            ],
        };

        let expected = script.actions().to_vec();
        let mut queue = script.spawn_feeder();

        let mut received = Vec::new();
        while let Some(action) = queue.recv().await {
            received.push(action);
        }

        assert_eq!(received, expected);
    }
}
