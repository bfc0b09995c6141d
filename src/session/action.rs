//! Attack actions and the queue they arrive on.

use std::{collections::VecDeque, time::Duration};

use tokio::sync::mpsc;

use crate::{
    protocol::{
        message::{channel::MessageChannel, constants::*},
        payload::{Block, NewBlock, Transaction},
    },
    session::{
        observer::{ExecutedAction, SessionEvent, SessionObserver},
        responder::send,
        SessionError, SessionOutcome,
    },
};

/// One step of an attack script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Relays a batch of transactions, the batch may be empty.
    SendTransactions(Vec<Transaction>),
    /// Announces a full block with a declared total difficulty.
    ///
    /// Without an explicit difficulty the session's configured one is declared.
    SendBlock {
        block: Box<Block>,
        difficulty: Option<u128>,
    },
    /// Pauses the session, nothing is sent or read meanwhile.
    Sleep(Duration),
    /// Ends the session and asks the embedding process to exit.
    Terminate,
}

/// A FIFO of attack actions, consumed one at a time by a session.
#[async_trait::async_trait]
pub trait ActionSource: Send {
    /// Waits for the next action, `None` once the queue is closed and drained.
    async fn next_action(&mut self) -> Option<Action>;
}

#[async_trait::async_trait]
impl ActionSource for mpsc::Receiver<Action> {
    async fn next_action(&mut self) -> Option<Action> {
        self.recv().await
    }
}

#[async_trait::async_trait]
impl ActionSource for VecDeque<Action> {
    async fn next_action(&mut self) -> Option<Action> {
        self.pop_front()
    }
}

#[async_trait::async_trait]
impl<'a, S: ActionSource + ?Sized> ActionSource for &'a mut S {
    async fn next_action(&mut self) -> Option<Action> {
        (**self).next_action().await
    }
}

/// Carries out a single action.
///
/// Returns the session outcome if the action ends the session.
pub(super) async fn execute<Ch, O>(
    action: Action,
    channel: &mut Ch,
    observer: &O,
    declared_difficulty: u128,
) -> Result<Option<SessionOutcome>, SessionError>
where
    Ch: MessageChannel,
    O: SessionObserver,
{
    let executed = match action {
        Action::SendTransactions(txs) => {
            send(channel, TRANSACTIONS_CODE, &txs).await?;
            ExecutedAction::Transactions { count: txs.len() }
        }
        Action::SendBlock { block, difficulty } => {
            let new_block = NewBlock {
                block: *block,
                total_difficulty: difficulty.unwrap_or(declared_difficulty),
            };
            send(channel, NEW_BLOCK_CODE, &new_block).await?;
            ExecutedAction::Block {
                number: new_block.block.number(),
                hash: new_block.block.hash(),
                total_difficulty: new_block.total_difficulty,
            }
        }
        Action::Sleep(duration) => {
            tokio::time::sleep(duration).await;
            ExecutedAction::Sleep(duration)
        }
        Action::Terminate => {
            observer.on_event(&SessionEvent::ActionExecuted(ExecutedAction::Terminate));
            return Ok(Some(SessionOutcome::TerminateProcess));
        }
    };

    observer.on_event(&SessionEvent::ActionExecuted(executed));

    Ok(None)
}
