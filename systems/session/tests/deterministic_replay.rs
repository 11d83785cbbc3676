use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use hearthvale_core::{
    protocol::{ClientMessage, ServerMessage},
    Intent, ItemStack, QuantitySelector, Tile,
};
use hearthvale_session::{Session, SessionConfig};
use hearthvale_system_transactions::InventoryProvider;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug)]
enum Step {
    Submit(&'static Intent),
    Frames(usize),
    Wall(Duration),
}

fn script() -> Vec<Step> {
    static HARVEST: Intent = Intent::HarvestAt {
        tile: Tile::new(12, 3),
    };
    static TO_BANK: Intent = Intent::OpenBank {
        booth: Some(Tile::new(2, 2)),
    };
    static DEPOSIT_ALL: Intent = Intent::DepositAll;
    static NOTE_MODE: Intent = Intent::SetNoteMode { enabled: true };
    static WITHDRAW: Intent = Intent::Withdraw {
        slot: 0,
        amount: QuantitySelector::All,
    };
    static MOVE: Intent = Intent::MoveTo {
        tile: Tile::new(18, 10),
    };

    let mut steps = Vec::new();
    for _ in 0..3 {
        steps.push(Step::Submit(&HARVEST));
        steps.push(Step::Frames(240));
    }
    steps.extend([
        Step::Wall(Duration::from_secs(3)),
        Step::Submit(&TO_BANK),
        Step::Frames(300),
        Step::Submit(&DEPOSIT_ALL),
        Step::Frames(1),
        Step::Wall(Duration::from_millis(450)),
        Step::Submit(&NOTE_MODE),
        Step::Submit(&WITHDRAW),
        Step::Submit(&MOVE),
        Step::Frames(37),
        Step::Wall(Duration::from_secs(10)),
    ]);
    steps
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    position_bits: (u32, u32),
    tile: Tile,
    tree_count: Option<u32>,
    bank: Vec<Option<ItemStack>>,
    inventory: Vec<Option<ItemStack>>,
    sent: Vec<ClientMessage>,
    notices: Vec<String>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.position_bits.hash(&mut hasher);
        self.tile.hash(&mut hasher);
        self.tree_count.hash(&mut hasher);
        self.bank.hash(&mut hasher);
        self.inventory.hash(&mut hasher);
        format!("{:?}", self.sent).hash(&mut hasher);
        self.notices.hash(&mut hasher);
        hasher.finish()
    }
}

fn replay(connected: bool) -> ReplayOutcome {
    let mut config = SessionConfig::demo().expect("demo config");
    config.connected = connected;
    let mut session = Session::from_config(&config, Vec::new()).expect("session");
    let mut notices = Vec::new();

    for step in script() {
        match step {
            Step::Submit(intent) => session.submit(intent.clone()),
            Step::Frames(count) => {
                for _ in 0..count {
                    session.frame(FRAME);
                }
            }
            Step::Wall(dt) => session.advance_clock(dt),
        }
        notices.extend(session.drain_notices().into_iter().map(|notice| notice.text));
    }

    let position = session.position();
    ReplayOutcome {
        position_bits: (position.x.to_bits(), position.y.to_bits()),
        tile: session.tile(),
        tree_count: session.node_count(Tile::new(12, 3)),
        bank: session.store().bank.slots().to_vec(),
        inventory: session.store().inventory.slots().to_vec(),
        sent: session.channel().clone(),
        notices,
    }
}

#[test]
fn offline_replay_is_deterministic() {
    let first = replay(false);
    let second = replay(false);

    assert_eq!(first, second, "offline replay diverged");
    assert_eq!(first.fingerprint(), second.fingerprint());

    // Three logs were banked, then withdrawn as a single noted stack.
    assert!(first.sent.is_empty());
    assert_eq!(first.bank.iter().flatten().count(), 0);
    assert_eq!(
        first.inventory.iter().flatten().collect::<Vec<_>>(),
        vec![&ItemStack::new("oak_logs", 3).into_noted()]
    );
    assert_eq!(first.tree_count, Some(3));
    assert!(first.notices.is_empty(), "{:?}", first.notices);
}

#[test]
fn connected_replay_sends_the_same_messages_every_time() {
    let first = replay(true);
    let second = replay(true);

    assert_eq!(first, second, "connected replay diverged");
    assert_eq!(first.fingerprint(), second.fingerprint());

    let deposits = first
        .sent
        .iter()
        .filter(|message| matches!(message, ClientMessage::BankDepositRequest { .. }))
        .count();
    assert_eq!(deposits, 3);
    assert!(first
        .sent
        .iter()
        .any(|message| matches!(message, ClientMessage::BankWithdrawRequest { note_mode: true, .. })));
    assert_eq!(first.sent[0], first.sent[1]);
}

#[test]
fn confirmations_overwrite_the_replayed_state() {
    let mut config = SessionConfig::demo().expect("demo config");
    config.connected = true;
    let mut session = Session::from_config(&config, Vec::new()).expect("session");
    session.submit(Intent::OpenBank {
        booth: Some(Tile::new(2, 2)),
    });
    for _ in 0..300 {
        session.frame(FRAME);
    }
    assert_eq!(session.channel(), &vec![ClientMessage::BankOpenRequest]);

    let canonical = ServerMessage::BankOpenConfirmed {
        bank_data: vec![Some(ItemStack::new("coins", 250))],
        tab_data: Vec::new(),
        inventory_data: Some(vec![Some(ItemStack::new("feather", 12))]),
        version: Some(3),
    };
    session.receive(&canonical);
    let once = (
        session.store().bank.slots().to_vec(),
        session.store().inventory.slots().to_vec(),
    );
    session.receive(&canonical);
    let twice = (
        session.store().bank.slots().to_vec(),
        session.store().inventory.slots().to_vec(),
    );

    assert_eq!(once, twice);
    assert_eq!(session.store().inventory.free_slots(), 27);
    assert_eq!(session.transactions().last_version(), Some(3));
}
