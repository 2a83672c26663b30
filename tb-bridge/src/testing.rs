//! Test doubles: an in-memory ledger, a frame server speaking the stream
//! protocol, and a fake native client library.
//!
//! Compiled for this crate's own tests and behind the `testing` feature for
//! everyone else.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::error::{InitStatus, PacketStatus};
use crate::event::{Event, EventSink};
use crate::internal::connection::read_frame;
use crate::protocol::result_code;
use crate::protocol::{
    decode_all, encode_all, Account, AccountFlags, CreateResult, Identifier, Message, Operation,
    RegisterReply, Transfer, TransferFlags,
};
use crate::transport::{AcquireStatus, CompletionFn, NativeClient, NativeLibrary, NativePacket};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// RecordingSink
// ============================================================================

/// Event sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    /// Events recorded so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// Forget every recorded event.
    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: Event) {
        lock(&self.events).push(event);
    }
}

// ============================================================================
// MemoryLedger
// ============================================================================

/// A ledger shared between a test and the doubles serving it.
pub type SharedLedger = Arc<Mutex<MemoryLedger>>;

/// Minimal in-memory ledger.
///
/// Applies create and lookup operations to encoded payloads and answers with
/// encoded results, reporting failures with the codes in
/// [`result_code`](crate::protocol::result_code). Linked chains and two-phase
/// posting are not modelled.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: HashMap<Identifier, Account>,
    transfers: HashMap<Identifier, Transfer>,
    timestamp: u64,
}

impl MemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty ledger ready to be shared.
    pub fn shared() -> SharedLedger {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Apply one request payload; returns the reply status and payload.
    pub fn apply(&mut self, operation: u16, payload: &[u8]) -> (PacketStatus, Vec<u8>) {
        let Ok(operation) = Operation::try_from(operation) else {
            return (PacketStatus::InvalidOperation, Vec::new());
        };
        let reply = match operation {
            Operation::CreateAccounts => decode_all::<Account>(payload).map(|accounts| {
                let results = self.create_accounts(&accounts);
                encode_all(&results)
            }),
            Operation::CreateTransfers => decode_all::<Transfer>(payload).map(|transfers| {
                let results = self.create_transfers(&transfers);
                encode_all(&results)
            }),
            Operation::LookupAccounts => {
                decode_all::<Identifier>(payload).map(|ids| encode_all(&self.lookup_accounts(&ids)))
            }
            Operation::LookupTransfers => decode_all::<Identifier>(payload)
                .map(|ids| encode_all(&self.lookup_transfers(&ids))),
            Operation::Register => return (PacketStatus::InvalidOperation, Vec::new()),
        };
        match reply {
            Ok(body) => (PacketStatus::Ok, body),
            Err(_) => (PacketStatus::InvalidDataSize, Vec::new()),
        }
    }

    /// Create accounts; returns the failures.
    pub fn create_accounts(&mut self, accounts: &[Account]) -> Vec<CreateResult> {
        failures(accounts.iter().map(|a| self.create_account(a)))
    }

    /// Create transfers; returns the failures.
    pub fn create_transfers(&mut self, transfers: &[Transfer]) -> Vec<CreateResult> {
        failures(transfers.iter().map(|t| self.create_transfer(t)))
    }

    /// Accounts found for `ids`, in request order.
    pub fn lookup_accounts(&self, ids: &[Identifier]) -> Vec<Account> {
        ids.iter().filter_map(|id| self.accounts.get(id).copied()).collect()
    }

    /// Transfers found for `ids`, in request order.
    pub fn lookup_transfers(&self, ids: &[Identifier]) -> Vec<Transfer> {
        ids.iter().filter_map(|id| self.transfers.get(id).copied()).collect()
    }

    /// Account stored under `id`.
    pub fn account(&self, id: Identifier) -> Option<Account> {
        self.accounts.get(&id).copied()
    }

    /// Transfer stored under `id`.
    pub fn transfer(&self, id: Identifier) -> Option<Transfer> {
        self.transfers.get(&id).copied()
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of stored transfers.
    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    fn tick(&mut self) -> u64 {
        self.timestamp += 1;
        self.timestamp
    }

    fn create_account(&mut self, account: &Account) -> u32 {
        use result_code::account as code;

        let exclusive =
            AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS | AccountFlags::CREDITS_MUST_NOT_EXCEED_DEBITS;
        if account.timestamp != 0 {
            return code::TIMESTAMP_MUST_BE_ZERO;
        }
        if account.id.is_zero() {
            return code::ID_MUST_NOT_BE_ZERO;
        }
        if account.id.as_u128() == u128::MAX {
            return code::ID_MUST_NOT_BE_INT_MAX;
        }
        if account.flags.contains(exclusive) {
            return code::FLAGS_ARE_MUTUALLY_EXCLUSIVE;
        }
        if account.debits_pending != 0 {
            return code::DEBITS_PENDING_MUST_BE_ZERO;
        }
        if account.ledger == 0 {
            return code::LEDGER_MUST_NOT_BE_ZERO;
        }
        if account.code == 0 {
            return code::CODE_MUST_NOT_BE_ZERO;
        }
        if let Some(existing) = self.accounts.get(&account.id) {
            return if existing.flags != account.flags {
                code::EXISTS_WITH_DIFFERENT_FLAGS
            } else {
                code::EXISTS
            };
        }

        let timestamp = self.tick();
        self.accounts.insert(
            account.id,
            Account {
                timestamp,
                ..*account
            },
        );
        0
    }

    fn create_transfer(&mut self, transfer: &Transfer) -> u32 {
        use result_code::transfer as code;

        if transfer.id.is_zero() {
            return code::ID_MUST_NOT_BE_ZERO;
        }
        if transfer.debit_account_id.is_zero() {
            return code::DEBIT_ACCOUNT_ID_MUST_NOT_BE_ZERO;
        }
        if transfer.credit_account_id.is_zero() {
            return code::CREDIT_ACCOUNT_ID_MUST_NOT_BE_ZERO;
        }
        if transfer.debit_account_id == transfer.credit_account_id {
            return code::ACCOUNTS_MUST_BE_DIFFERENT;
        }
        if transfer.ledger == 0 {
            return code::LEDGER_MUST_NOT_BE_ZERO;
        }
        if transfer.code == 0 {
            return code::CODE_MUST_NOT_BE_ZERO;
        }
        if self.transfers.contains_key(&transfer.id) {
            return code::EXISTS;
        }
        let Some(debit) = self.accounts.get(&transfer.debit_account_id).copied() else {
            return code::DEBIT_ACCOUNT_NOT_FOUND;
        };
        let Some(credit) = self.accounts.get(&transfer.credit_account_id).copied() else {
            return code::CREDIT_ACCOUNT_NOT_FOUND;
        };
        if debit.ledger != credit.ledger {
            return code::ACCOUNTS_MUST_HAVE_THE_SAME_LEDGER;
        }
        if transfer.ledger != debit.ledger {
            return code::TRANSFER_MUST_HAVE_THE_SAME_LEDGER_AS_ACCOUNTS;
        }

        let amount = transfer.amount;
        if debit.flags.contains(AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS) {
            let debits = debit
                .debits_pending
                .saturating_add(debit.debits_posted)
                .saturating_add(amount);
            if debits > debit.credits_posted {
                return code::EXCEEDS_CREDITS;
            }
        }
        if credit.flags.contains(AccountFlags::CREDITS_MUST_NOT_EXCEED_DEBITS) {
            let credits = credit
                .credits_pending
                .saturating_add(credit.credits_posted)
                .saturating_add(amount);
            if credits > credit.debits_posted {
                return code::EXCEEDS_DEBITS;
            }
        }

        let pending = transfer.flags.contains(TransferFlags::PENDING);
        if let Some(debit) = self.accounts.get_mut(&transfer.debit_account_id) {
            if pending {
                debit.debits_pending = debit.debits_pending.saturating_add(amount);
            } else {
                debit.debits_posted = debit.debits_posted.saturating_add(amount);
            }
        }
        if let Some(credit) = self.accounts.get_mut(&transfer.credit_account_id) {
            if pending {
                credit.credits_pending = credit.credits_pending.saturating_add(amount);
            } else {
                credit.credits_posted = credit.credits_posted.saturating_add(amount);
            }
        }

        let timestamp = self.tick();
        self.transfers.insert(
            transfer.id,
            Transfer {
                timestamp,
                ..*transfer
            },
        );
        0
    }
}

fn failures(codes: impl Iterator<Item = u32>) -> Vec<CreateResult> {
    codes
        .enumerate()
        .filter(|(_, result)| *result != 0)
        .map(|(index, result)| CreateResult {
            index: index as u32,
            result,
        })
        .collect()
}

// ============================================================================
// FakeServer
// ============================================================================

/// Options for a [`FakeServer`].
#[derive(Clone, Debug)]
pub struct FakeServerBuilder {
    batch_size_limit: u32,
    reorder: usize,
    reply_delay: Duration,
    silent: HashSet<u16>,
    drop_after: Option<usize>,
    byte_by_byte: bool,
    reject_register: Option<PacketStatus>,
    stall_reads: Duration,
    ledger: Option<SharedLedger>,
}

impl FakeServerBuilder {
    /// Batch size limit announced in the handshake reply (0 = none).
    pub fn batch_size_limit(mut self, limit: u32) -> Self {
        self.batch_size_limit = limit;
        self
    }

    /// Hold replies until `window` of them are ready, then send them in
    /// reverse order.
    pub fn reorder(mut self, window: usize) -> Self {
        self.reorder = window;
        self
    }

    /// Delay every reply.
    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Never answer requests for `operation`.
    pub fn silent(mut self, operation: Operation) -> Self {
        self.silent.insert(operation.code());
        self
    }

    /// Drop the first connection after it delivered `frames` request frames,
    /// without answering the last one.
    pub fn drop_after(mut self, frames: usize) -> Self {
        self.drop_after = Some(frames);
        self
    }

    /// Write replies one byte at a time.
    pub fn byte_by_byte(mut self) -> Self {
        self.byte_by_byte = true;
        self
    }

    /// Answer the handshake with `status`.
    pub fn reject_register(mut self, status: PacketStatus) -> Self {
        self.reject_register = Some(status);
        self
    }

    /// Stop reading for `delay` right after the handshake, so the client's
    /// writes back up in the socket buffers.
    pub fn stall_reads(mut self, delay: Duration) -> Self {
        self.stall_reads = delay;
        self
    }

    /// Serve from an existing ledger.
    pub fn ledger(mut self, ledger: SharedLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Bind to an ephemeral localhost port and start accepting.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(self) -> FakeServer {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(e) => panic!("failed to bind fake server: {}", e),
        };
        let address = match listener.local_addr() {
            Ok(address) => address,
            Err(e) => panic!("fake server has no local address: {}", e),
        };

        let state = Arc::new(ServerState {
            ledger: self.ledger.clone().unwrap_or_else(MemoryLedger::shared),
            options: self,
            frames: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            live: Mutex::new(Vec::new()),
        });
        let accept = tokio::spawn(accept_loop(listener, Arc::clone(&state)));

        FakeServer {
            address,
            state,
            accept,
        }
    }
}

struct ServerState {
    options: FakeServerBuilder,
    ledger: SharedLedger,
    frames: Mutex<Vec<Message>>,
    connections: AtomicUsize,
    live: Mutex<Vec<JoinHandle<()>>>,
}

/// Stream-protocol server backed by a [`MemoryLedger`].
pub struct FakeServer {
    address: SocketAddr,
    state: Arc<ServerState>,
    accept: JoinHandle<()>,
}

impl FakeServer {
    /// Start configuring a server.
    pub fn builder() -> FakeServerBuilder {
        FakeServerBuilder {
            batch_size_limit: 0,
            reorder: 0,
            reply_delay: Duration::ZERO,
            silent: HashSet::new(),
            drop_after: None,
            byte_by_byte: false,
            reject_register: None,
            stall_reads: Duration::ZERO,
            ledger: None,
        }
    }

    /// `host:port` the server listens on.
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    /// Request frames received so far (handshakes excluded).
    pub fn frames(&self) -> Vec<Message> {
        lock(&self.state.frames).clone()
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::Acquire)
    }

    /// The ledger behind the server.
    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.state.ledger)
    }

    /// Close every open connection; new ones are still accepted.
    pub fn disconnect_all(&self) {
        for task in lock(&self.state.live).drain(..) {
            task.abort();
        }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.accept.abort();
        self.disconnect_all();
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<ServerState>) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let index = state.connections.fetch_add(1, Ordering::AcqRel);
        let task = tokio::spawn(serve(stream, Arc::clone(&state), index));
        lock(&state.live).push(task);
    }
}

type SharedWriter = Arc<tokio::sync::Mutex<OwnedWriteHalf>>;

async fn serve(stream: TcpStream, state: Arc<ServerState>, index: usize) {
    let options = &state.options;
    let (mut reader, writer) = stream.into_split();
    let writer: SharedWriter = Arc::new(tokio::sync::Mutex::new(writer));

    let Ok(register) = read_frame(&mut reader).await else {
        return;
    };
    if register.header().operation != Operation::Register.code() {
        return;
    }
    let status = options.reject_register.unwrap_or(PacketStatus::Ok);
    let reply = Message::reply(
        Operation::Register.code(),
        status,
        0,
        RegisterReply::new(options.batch_size_limit).to_bytes(),
    );
    if send(&writer, &reply, false).await.is_err() || status != PacketStatus::Ok {
        return;
    }

    if !options.stall_reads.is_zero() {
        tokio::time::sleep(options.stall_reads).await;
    }

    let mut held = Vec::new();
    let mut received = 0;
    while let Ok(request) = read_frame(&mut reader).await {
        lock(&state.frames).push(request.clone());
        received += 1;
        if index == 0 && options.drop_after == Some(received) {
            return;
        }

        let header = *request.header();
        if options.silent.contains(&header.operation) {
            continue;
        }
        let (status, body) = lock(&state.ledger).apply(header.operation, request.body());
        let reply = Message::reply(header.operation, status, header.tag, body);

        if options.reorder > 1 {
            held.push(reply);
            if held.len() < options.reorder {
                continue;
            }
            for reply in held.drain(..).rev() {
                respond(&writer, reply, options).await;
            }
        } else {
            respond(&writer, reply, options).await;
        }
    }
}

async fn respond(writer: &SharedWriter, reply: Message, options: &FakeServerBuilder) {
    let byte_by_byte = options.byte_by_byte;
    if options.reply_delay.is_zero() {
        let _ = send(writer, &reply, byte_by_byte).await;
        return;
    }
    let writer = Arc::clone(writer);
    let delay = options.reply_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = send(&writer, &reply, byte_by_byte).await;
    });
}

async fn send(writer: &SharedWriter, message: &Message, byte_by_byte: bool) -> std::io::Result<()> {
    let bytes = message.encode();
    let mut writer = writer.lock().await;
    if byte_by_byte {
        for byte in bytes {
            writer.write_all(&[byte]).await?;
            writer.flush().await?;
        }
        Ok(())
    } else {
        writer.write_all(&bytes).await?;
        writer.flush().await
    }
}

// ============================================================================
// FakeLibrary
// ============================================================================

/// Native library double backed by a [`MemoryLedger`].
///
/// Completions are delivered from a freshly spawned OS thread, never from the
/// thread that submitted the packet.
#[derive(Clone, Debug)]
pub struct FakeLibrary {
    ledger: SharedLedger,
    delay: Duration,
    packet_limit: Option<u32>,
    init_status: Option<InitStatus>,
    submitted: Arc<AtomicUsize>,
}

impl FakeLibrary {
    /// A library serving a fresh ledger.
    pub fn new() -> Self {
        Self::with_ledger(MemoryLedger::shared())
    }

    /// A library serving `ledger`.
    pub fn with_ledger(ledger: SharedLedger) -> Self {
        Self {
            ledger,
            delay: Duration::ZERO,
            packet_limit: None,
            init_status: None,
            submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every completion.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cap the packet pool below what the client asks for.
    pub fn packet_limit(mut self, packets: u32) -> Self {
        self.packet_limit = Some(packets);
        self
    }

    /// Make `init` fail with `status`.
    pub fn fail_init(mut self, status: InitStatus) -> Self {
        self.init_status = Some(status);
        self
    }

    /// The ledger behind the library.
    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }

    /// Packets submitted across all clients.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Acquire)
    }
}

impl Default for FakeLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeLibrary for FakeLibrary {
    fn init(
        &self,
        _cluster: Identifier,
        _addresses: &str,
        packets_count: u32,
        on_completion: CompletionFn,
    ) -> std::result::Result<Box<dyn NativeClient>, InitStatus> {
        if let Some(status) = self.init_status {
            return Err(status);
        }
        let packets = self
            .packet_limit
            .map_or(packets_count, |limit| limit.min(packets_count));
        Ok(Box::new(FakeNativeClient {
            inner: Arc::new(NativeInner {
                ledger: Arc::clone(&self.ledger),
                delay: self.delay,
                free: Mutex::new((0..packets).rev().collect()),
                shutdown: AtomicBool::new(false),
                on_completion,
                submitted: Arc::clone(&self.submitted),
            }),
        }))
    }
}

struct NativeInner {
    ledger: SharedLedger,
    delay: Duration,
    free: Mutex<Vec<u32>>,
    shutdown: AtomicBool,
    on_completion: CompletionFn,
    submitted: Arc<AtomicUsize>,
}

/// Client handed out by [`FakeLibrary`].
pub struct FakeNativeClient {
    inner: Arc<NativeInner>,
}

impl NativeClient for FakeNativeClient {
    fn acquire_packet(&self) -> std::result::Result<NativePacket, AcquireStatus> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(AcquireStatus::Shutdown);
        }
        let slot = lock(&self.inner.free)
            .pop()
            .ok_or(AcquireStatus::ConcurrencyMaxExceeded)?;
        Ok(NativePacket {
            slot,
            ..NativePacket::default()
        })
    }

    fn submit(&self, mut packet: NativePacket) {
        self.inner.submitted.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(&self.inner);
        std::thread::spawn(move || {
            if !inner.delay.is_zero() {
                std::thread::sleep(inner.delay);
            }
            if inner.shutdown.load(Ordering::Acquire) {
                packet.status = PacketStatus::ClientShutdown;
                (inner.on_completion)(packet, Vec::new());
                return;
            }
            let (status, result) = lock(&inner.ledger).apply(packet.operation, &packet.data);
            packet.status = status;
            (inner.on_completion)(packet, result);
        });
    }

    fn release_packet(&self, packet: NativePacket) {
        lock(&self.inner.free).push(packet.slot);
    }

    fn deinit(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::result_code::{account as account_code, transfer as transfer_code};

    fn account(id: u64, flags: AccountFlags) -> Account {
        Account {
            id: Identifier::new(0, id),
            ledger: 1,
            code: 10,
            flags,
            ..Account::default()
        }
    }

    fn transfer(id: u64, debit: u64, credit: u64, amount: u128) -> Transfer {
        Transfer {
            id: Identifier::new(0, id),
            debit_account_id: Identifier::new(0, debit),
            credit_account_id: Identifier::new(0, credit),
            amount,
            ledger: 1,
            code: 1,
            ..Transfer::default()
        }
    }

    #[test]
    fn test_create_accounts_reports_failures_by_index() {
        let mut ledger = MemoryLedger::new();
        let results = ledger.create_accounts(&[
            account(1, AccountFlags::empty()),
            account(0, AccountFlags::empty()),
            account(1, AccountFlags::HISTORY),
            Account {
                ledger: 0,
                ..account(3, AccountFlags::empty())
            },
        ]);
        assert_eq!(
            results,
            vec![
                CreateResult { index: 1, result: account_code::ID_MUST_NOT_BE_ZERO },
                CreateResult { index: 2, result: account_code::EXISTS_WITH_DIFFERENT_FLAGS },
                CreateResult { index: 3, result: account_code::LEDGER_MUST_NOT_BE_ZERO },
            ]
        );
        assert_eq!(ledger.account_count(), 1);
        assert_ne!(ledger.account(Identifier::new(0, 1)).unwrap().timestamp, 0);
    }

    #[test]
    fn test_transfers_move_balances() {
        let mut ledger = MemoryLedger::new();
        ledger.create_accounts(&[
            account(1, AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS),
            account(2, AccountFlags::empty()),
        ]);

        let results = ledger.create_transfers(&[
            transfer(10, 2, 1, 100),
            transfer(11, 1, 2, 60),
            transfer(12, 1, 2, 60),
            transfer(13, 1, 9, 1),
        ]);
        assert_eq!(
            results,
            vec![
                CreateResult { index: 2, result: transfer_code::EXCEEDS_CREDITS },
                CreateResult { index: 3, result: transfer_code::CREDIT_ACCOUNT_NOT_FOUND },
            ]
        );

        let one = ledger.account(Identifier::new(0, 1)).unwrap();
        assert_eq!((one.credits_posted, one.debits_posted), (100, 60));
        assert_eq!(ledger.transfer_count(), 2);
    }

    #[test]
    fn test_apply_payloads() {
        let mut ledger = MemoryLedger::new();
        let (status, body) = ledger.apply(
            Operation::CreateAccounts.code(),
            &encode_all(&[account(5, AccountFlags::empty())]),
        );
        assert_eq!(status, PacketStatus::Ok);
        assert!(body.is_empty());

        let (status, body) = ledger.apply(
            Operation::LookupAccounts.code(),
            &encode_all(&[Identifier::new(0, 5), Identifier::new(0, 6)]),
        );
        assert_eq!(status, PacketStatus::Ok);
        let found: Vec<Account> = decode_all(&body).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Identifier::new(0, 5));

        assert_eq!(
            ledger.apply(Operation::LookupAccounts.code(), &[0; 7]).0,
            PacketStatus::InvalidDataSize
        );
        assert_eq!(ledger.apply(999, &[]).0, PacketStatus::InvalidOperation);
    }

    #[test]
    fn test_fake_native_client_pool() {
        let library = FakeLibrary::new().packet_limit(1);
        let client = library
            .init(Identifier::ZERO, "", 8, Arc::new(|_: NativePacket, _: Vec<u8>| {}))
            .unwrap();
        let packet = client.acquire_packet().unwrap();
        assert_eq!(
            client.acquire_packet().unwrap_err(),
            AcquireStatus::ConcurrencyMaxExceeded
        );
        client.release_packet(packet);
        assert!(client.acquire_packet().is_ok());

        client.deinit();
        assert_eq!(client.acquire_packet().unwrap_err(), AcquireStatus::Shutdown);
    }
}
