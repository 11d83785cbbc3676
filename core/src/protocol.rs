//! Message surface exchanged with the authoritative server.
//!
//! Messages travel as JSON objects tagged by a kebab-case `type` field with
//! camelCase payload fields, e.g.
//! `{"type":"bank-reorganize-request","fromSlot":3,"toSlot":9}`. Snapshot
//! payloads always carry the entire container rather than a diff.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ItemId, ItemStack, NodeKey, NodeKind, Tile};

/// Contents of a bank or inventory container, one entry per slot.
pub type SlotData = Vec<Option<ItemStack>>;

/// What a client did to a resource node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeAction {
    /// One unit was harvested from the node.
    Harvest,
    /// The node ran out of resources.
    Deplete,
}

/// Messages sent from the client to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Asks for the canonical bank contents; also used as the authoritative refresh.
    BankOpenRequest,
    /// Moves units from an inventory slot into the bank.
    BankDepositRequest {
        /// Inventory slot the units come from.
        inventory_slot: usize,
        /// Stack being deposited, as seen by the client.
        item: ItemStack,
        /// Number of units to deposit.
        quantity: u32,
        /// Bank tab active when the request was issued.
        current_tab: usize,
    },
    /// Moves units from a bank slot into the inventory.
    BankWithdrawRequest {
        /// Bank slot the units come from.
        bank_slot: usize,
        /// Stack being withdrawn, as seen by the client.
        item: ItemStack,
        /// Number of units to withdraw.
        quantity: u32,
        /// Whether the units should arrive noted.
        note_mode: bool,
    },
    /// Swaps or moves two bank slots.
    BankReorganizeRequest {
        /// Slot being dragged.
        from_slot: usize,
        /// Slot being dropped onto.
        to_slot: usize,
    },
    /// Pushes the full local bank, e.g. when the bank closes.
    BankSync {
        /// Entire local bank contents.
        bank_data: SlotData,
    },
    /// Changes the icon shown for a bank tab.
    BankTabIconUpdate {
        /// Tab whose icon changes.
        tab_index: usize,
        /// Item used as the icon, or `None` to reset.
        icon: Option<ItemId>,
    },
    /// Reports an interaction with a resource node.
    ResourceAction {
        /// Kind of the node.
        node_type: NodeKind,
        /// Column of the node.
        x: u32,
        /// Row of the node.
        y: u32,
        /// What happened to the node.
        action: NodeAction,
    },
}

impl ClientMessage {
    /// Builds a resource report for the provided node.
    #[must_use]
    pub fn resource_action(key: &NodeKey, action: NodeAction) -> Self {
        Self::ResourceAction {
            node_type: key.kind.clone(),
            x: key.tile.x(),
            y: key.tile.y(),
            action,
        }
    }
}

/// Messages sent from the server to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Canonical bank contents in response to an open or refresh request.
    BankOpenConfirmed {
        /// Entire bank contents.
        bank_data: SlotData,
        /// Icon per bank tab.
        #[serde(default)]
        tab_data: Vec<Option<ItemId>>,
        /// Entire inventory contents, when the server includes them.
        #[serde(default)]
        inventory_data: Option<SlotData>,
        /// Snapshot version, when the server stamps one.
        #[serde(default)]
        version: Option<u64>,
    },
    /// The bank could not be opened.
    BankOpenDenied {
        /// Reason shown to the player.
        reason: String,
    },
    /// A deposit was accepted.
    BankDepositConfirmed {
        /// Entire bank contents after the deposit.
        updated_bank: SlotData,
        /// Entire inventory contents after the deposit.
        updated_inventory: SlotData,
        /// Stack that was deposited.
        item: Option<ItemStack>,
        /// Snapshot version, when the server stamps one.
        #[serde(default)]
        version: Option<u64>,
    },
    /// A deposit was rejected.
    BankDepositDenied {
        /// Reason shown to the player.
        reason: String,
    },
    /// A withdrawal was accepted.
    BankWithdrawConfirmed {
        /// Entire bank contents after the withdrawal.
        updated_bank: SlotData,
        /// Entire inventory contents after the withdrawal.
        updated_inventory: SlotData,
        /// Stack that was withdrawn.
        item: Option<ItemStack>,
        /// Snapshot version, when the server stamps one.
        #[serde(default)]
        version: Option<u64>,
    },
    /// A withdrawal was rejected.
    BankWithdrawDenied {
        /// Reason shown to the player.
        reason: String,
    },
    /// A reorganize request was accepted.
    BankReorganizeConfirmed {
        /// Entire bank contents after the move.
        bank_data: SlotData,
        /// Snapshot version, when the server stamps one.
        #[serde(default)]
        version: Option<u64>,
    },
    /// A reorganize request was rejected.
    BankReorganizeDenied {
        /// Reason shown to the player.
        reason: String,
    },
    /// A resource node is depleted.
    ResourceDepleted {
        /// Kind of the node.
        node_type: NodeKind,
        /// Column of the node.
        x: u32,
        /// Row of the node.
        y: u32,
    },
    /// A resource node regained resources.
    ResourceRespawned {
        /// Kind of the node.
        node_type: NodeKind,
        /// Column of the node.
        x: u32,
        /// Row of the node.
        y: u32,
        /// Exact resource count, or `None` for a full node.
        #[serde(default)]
        count: Option<u32>,
    },
}

impl ServerMessage {
    /// Key of the resource node the message refers to, if any.
    #[must_use]
    pub fn node_key(&self) -> Option<NodeKey> {
        match self {
            Self::ResourceDepleted { node_type, x, y }
            | Self::ResourceRespawned {
                node_type, x, y, ..
            } => Some(NodeKey::new(node_type.clone(), Tile::new(*x, *y))),
            _ => None,
        }
    }
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload was not a valid message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised by a [`SyncChannel`] transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The connection to the server is gone.
    #[error("sync channel is closed")]
    Closed,
    /// The message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Bidirectional transport to the authoritative server, outbound half.
///
/// Inbound messages are delivered by whoever owns the connection, by handing
/// decoded [`ServerMessage`] values to the session.
pub trait SyncChannel {
    /// Queues a message for delivery.
    fn send(&mut self, message: ClientMessage) -> Result<(), ChannelError>;
}

/// Recording channel: every message is appended and never fails.
impl SyncChannel for Vec<ClientMessage> {
    fn send(&mut self, message: ClientMessage) -> Result<(), ChannelError> {
        self.push(message);
        Ok(())
    }
}

impl<C: SyncChannel + ?Sized> SyncChannel for Box<C> {
    fn send(&mut self, message: ClientMessage) -> Result<(), ChannelError> {
        (**self).send(message)
    }
}

/// Encodes a client message into its JSON wire form.
pub fn encode_client(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a client message from its JSON wire form.
pub fn decode_client(payload: &str) -> Result<ClientMessage, ProtocolError> {
    Ok(serde_json::from_str(payload)?)
}

/// Encodes a server message into its JSON wire form.
pub fn encode_server(message: &ServerMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a server message from its JSON wire form.
pub fn decode_server(payload: &str) -> Result<ServerMessage, ProtocolError> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deposit_request_uses_camel_case_fields() {
        let message = ClientMessage::BankDepositRequest {
            inventory_slot: 4,
            item: ItemStack::new("coins", 10),
            quantity: 10,
            current_tab: 0,
        };
        let value: serde_json::Value =
            serde_json::from_str(&encode_client(&message).expect("encode")).expect("json");

        assert_eq!(
            value,
            json!({
                "type": "bank-deposit-request",
                "inventorySlot": 4,
                "item": {"id": "coins", "quantity": 10},
                "quantity": 10,
                "currentTab": 0,
            })
        );
    }

    #[test]
    fn open_request_is_a_bare_tag() {
        let encoded = encode_client(&ClientMessage::BankOpenRequest).expect("encode");
        assert_eq!(encoded, r#"{"type":"bank-open-request"}"#);
    }

    #[test]
    fn decodes_open_confirmed_without_optional_fields() {
        let message = decode_server(
            r#"{"type":"bank-open-confirmed","bankData":[null,{"id":"coins","quantity":3}]}"#,
        )
        .expect("decode");

        assert_eq!(
            message,
            ServerMessage::BankOpenConfirmed {
                bank_data: vec![None, Some(ItemStack::new("coins", 3))],
                tab_data: Vec::new(),
                inventory_data: None,
                version: None,
            }
        );
    }

    #[test]
    fn decodes_resource_events_into_node_keys() {
        let message =
            decode_server(r#"{"type":"resource-depleted","nodeType":"tree","x":4,"y":7}"#)
                .expect("decode");
        assert_eq!(
            message.node_key(),
            Some(NodeKey::new(NodeKind::new("tree"), Tile::new(4, 7)))
        );

        let respawned = decode_server(
            r#"{"type":"resource-respawned","nodeType":"tree","x":4,"y":7,"count":2}"#,
        )
        .expect("decode");
        assert!(matches!(
            respawned,
            ServerMessage::ResourceRespawned { count: Some(2), .. }
        ));
    }

    #[test]
    fn rejects_unknown_message_types() {
        let error = decode_server(r#"{"type":"bank-explode"}"#).expect_err("should fail");
        assert!(matches!(error, ProtocolError::Malformed(_)));
    }

    #[test]
    fn server_messages_survive_the_wire() {
        let message = ServerMessage::BankReorganizeDenied {
            reason: "That slot is locked.".into(),
        };
        let decoded = decode_server(&encode_server(&message).expect("encode")).expect("decode");
        assert_eq!(decoded, message);

        let request = ClientMessage::resource_action(
            &NodeKey::new(NodeKind::new("copper_rock"), Tile::new(1, 2)),
            NodeAction::Deplete,
        );
        let decoded = decode_client(&encode_client(&request).expect("encode")).expect("decode");
        assert_eq!(decoded, request);
    }

    #[test]
    fn recording_channel_keeps_messages_in_order() {
        let mut channel: Vec<ClientMessage> = Vec::new();
        channel.send(ClientMessage::BankOpenRequest).expect("send");
        channel
            .send(ClientMessage::BankReorganizeRequest {
                from_slot: 0,
                to_slot: 1,
            })
            .expect("send");
        assert_eq!(channel.len(), 2);
        assert_eq!(channel[0], ClientMessage::BankOpenRequest);
    }
}
