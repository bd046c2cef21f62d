use borsh::BorshSerialize;
use lm_gauge::{
    constants::WAD,
    instruction::{self, gauge_address, user_address, SourceKeys},
    sources::{EmissionSchedule, MarketMakerView, VoteEscrowSupply, WeightHistory},
    state::{GaugeAccount, GaugeConfig, GaugeState, UserPosition},
};
use solana_program::{clock::Clock, instruction::AccountMeta, pubkey::Pubkey};
use solana_program_test::*;
use solana_sdk::{
    account::Account,
    instruction::{Instruction, InstructionError},
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};

const T0: i64 = 1_700_000_000;

struct Setup {
    context: ProgramTestContext,
    amm: Keypair,
    coins: [Pubkey; 2],
    sources: SourceKeys,
    ve_supply: Pubkey,
    ve_program: Pubkey,
    minter: Keypair,
    minter_program: Pubkey,
}

fn snapshot_account(data: Vec<u8>, owner: Pubkey) -> Account {
    Account {
        lamports: 1_000_000_000,
        data,
        owner,
        executable: false,
        rent_epoch: 0,
    }
}

impl Setup {
    async fn start() -> Self {
        let program_id = lm_gauge::id();
        let mut program_test =
            ProgramTest::new("lm_gauge", program_id, processor!(lm_gauge::process));

        let amm = Keypair::new();
        let coins = [Pubkey::new_unique(), Pubkey::new_unique()];
        let amm_program = Pubkey::new_unique();
        let mut amm_data = MarketMakerView { coins }.to_prefix([9; 8]);
        amm_data.resize(256, 0);
        program_test.add_account(amm.pubkey(), snapshot_account(amm_data, amm_program));

        let token_program = Pubkey::new_unique();
        let emission = Pubkey::new_unique();
        program_test.add_account(
            emission,
            snapshot_account(
                EmissionSchedule::constant(WAD, T0 - 1_000).try_to_vec().unwrap(),
                token_program,
            ),
        );

        let weights = Pubkey::new_unique();
        let (gauge, _) = gauge_address(&program_id, &amm.pubkey());
        program_test.add_account(
            weights,
            snapshot_account(
                WeightHistory::constant(gauge, WAD).try_to_vec().unwrap(),
                Pubkey::new_unique(),
            ),
        );

        let ve_program = Pubkey::new_unique();
        let ve_supply = Pubkey::new_unique();
        program_test.add_account(
            ve_supply,
            snapshot_account(VoteEscrowSupply::new(0).try_to_vec().unwrap(), ve_program),
        );

        let mut context = program_test.start_with_context().await;
        let mut clock: Clock = context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp = T0;
        context.set_sysvar(&clock);

        Self {
            context,
            amm,
            coins,
            sources: SourceKeys {
                emission_schedule: emission,
                weight_history: weights,
            },
            ve_supply,
            ve_program,
            minter: Keypair::new(),
            minter_program: Pubkey::new_unique(),
        }
    }

    fn gauge(&self) -> Pubkey {
        gauge_address(&lm_gauge::id(), &self.amm.pubkey()).0
    }

    async fn warp_to(&mut self, unix_timestamp: i64) {
        let mut clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp = unix_timestamp;
        self.context.set_sysvar(&clock);
    }

    async fn send(
        &mut self,
        ix: Instruction,
        extra_signers: &[&Keypair],
    ) -> Result<(), BanksClientError> {
        let blockhash = self.context.get_new_latest_blockhash().await.unwrap();
        let mut signers = vec![&self.context.payer];
        signers.extend_from_slice(extra_signers);
        let tx = Transaction::new_signed_with_payer(
            &[ix],
            Some(&self.context.payer.pubkey()),
            &signers,
            blockhash,
        );
        self.context.banks_client.process_transaction(tx).await
    }

    fn initialize_ix(&self) -> Instruction {
        instruction::initialize(
            &lm_gauge::id(),
            &self.context.payer.pubkey(),
            &self.amm.pubkey(),
            self.sources,
            &self.ve_supply,
            self.minter.pubkey(),
            self.minter_program,
            self.ve_program,
            GaugeConfig::default(),
        )
        .unwrap()
    }

    async fn initialize(&mut self) {
        let ix = self.initialize_ix();
        self.send(ix, &[]).await.unwrap();
    }

    async fn stake(&mut self, user: &Pubkey, start: i32, shares: Vec<u128>) {
        let ix = instruction::sync_position(
            &lm_gauge::id(),
            &self.amm.pubkey(),
            &self.context.payer.pubkey(),
            self.sources,
            &self.ve_supply,
            &self.ve_program,
            user,
            (0, 0),
            start,
            vec![WAD; shares.len()],
            start,
            shares,
        )
        .unwrap();
        let amm = self.amm.insecure_clone();
        self.send(ix, &[&amm]).await.unwrap();
    }

    async fn gauge_state(&mut self) -> GaugeState {
        let account = self
            .context
            .banks_client
            .get_account(self.gauge())
            .await
            .unwrap()
            .unwrap();
        GaugeState::unpack(&account.data).unwrap()
    }

    async fn position(&mut self, user: &Pubkey) -> UserPosition {
        let (key, _) = user_address(&lm_gauge::id(), &self.gauge(), user);
        let account = self
            .context
            .banks_client
            .get_account(key)
            .await
            .unwrap()
            .unwrap();
        UserPosition::unpack(&account.data).unwrap()
    }
}

fn custom_error(err: BanksClientError) -> u32 {
    match err.unwrap() {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => code,
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_initialize_binds_gauge() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let state = setup.gauge_state().await;
    assert!(state.is_active());
    assert_eq!(state.binding.amm, setup.amm.pubkey());
    assert_eq!(state.binding.collateral_mint, setup.coins[1]);
    assert_eq!(state.binding.minter, setup.minter.pubkey());
    assert_eq!(state.inflation_rate, WAD);
    assert_eq!(state.integral.timestamp, T0);

    let ix = setup.initialize_ix();
    let err = setup.send(ix, &[]).await.unwrap_err();
    assert_eq!(custom_error(err), 3);
}

#[tokio::test]
async fn test_stake_and_checkpoint() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let alice = Keypair::new();
    setup.stake(&alice.pubkey(), 5, vec![10 * WAD, 20 * WAD]).await;

    let position = setup.position(&alice.pubkey()).await;
    assert_eq!(position.band_start, 5);
    assert_eq!(position.range_size, 2);
    assert_eq!(position.raw_collateral, 30 * WAD);
    assert_eq!(position.working_balance, 12 * WAD);
    assert_eq!(setup.gauge_state().await.working_supply, 12 * WAD);

    setup.warp_to(T0 + 100).await;
    let ix = instruction::checkpoint(
        &lm_gauge::id(),
        &alice.pubkey(),
        &setup.amm.pubkey(),
        setup.sources,
        &setup.ve_supply,
        &setup.ve_program,
        &alice.pubkey(),
        (5, 2),
    )
    .unwrap();
    setup.send(ix, &[&alice]).await.unwrap();

    let accrued = setup.position(&alice.pubkey()).await.claimable_accrued;
    assert!(accrued <= 100 * WAD);
    assert!(100 * WAD - accrued < 1_000);
}

#[tokio::test]
async fn test_claimable_returns_amount() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let alice = Pubkey::new_unique();
    setup.stake(&alice, 0, vec![WAD]).await;
    setup.warp_to(T0 + 50).await;

    let ix = instruction::claimable(
        &lm_gauge::id(),
        &setup.amm.pubkey(),
        setup.sources,
        &setup.ve_supply,
        &setup.ve_program,
        &setup.minter_program,
        &alice,
        (0, 1),
    )
    .unwrap();
    let blockhash = setup.context.get_new_latest_blockhash().await.unwrap();
    let tx = Transaction::new_signed_with_payer(
        &[ix],
        Some(&setup.context.payer.pubkey()),
        &[&setup.context.payer],
        blockhash,
    );
    let simulation = setup
        .context
        .banks_client
        .simulate_transaction(tx)
        .await
        .unwrap();
    let return_data = simulation
        .simulation_details
        .unwrap()
        .return_data
        .unwrap();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&return_data.data);
    let amount = u128::from_le_bytes(bytes);
    assert!(amount <= 50 * WAD);
    assert!(50 * WAD - amount < 1_000);
}

#[tokio::test]
async fn test_callback_from_other_signer_rejected() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let impostor = Keypair::new();
    let mut ix = instruction::collateral_shares_changed(
        &lm_gauge::id(),
        &setup.amm.pubkey(),
        &setup.context.payer.pubkey(),
        setup.sources,
        0,
        vec![WAD],
    )
    .unwrap();
    ix.accounts[0] = AccountMeta::new_readonly(impostor.pubkey(), true);

    let err = setup.send(ix, &[&impostor]).await.unwrap_err();
    assert_eq!(custom_error(err), 1);
}

#[tokio::test]
async fn test_checkpoint_by_stranger_rejected() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let alice = Pubkey::new_unique();
    setup.stake(&alice, 0, vec![WAD]).await;

    let stranger = Keypair::new();
    let ix = instruction::checkpoint(
        &lm_gauge::id(),
        &stranger.pubkey(),
        &setup.amm.pubkey(),
        setup.sources,
        &setup.ve_supply,
        &setup.ve_program,
        &alice,
        (0, 1),
    )
    .unwrap();
    let err = setup.send(ix, &[&stranger]).await.unwrap_err();
    assert_eq!(custom_error(err), 1);

    let minter = setup.minter.insecure_clone();
    let ix = instruction::checkpoint(
        &lm_gauge::id(),
        &minter.pubkey(),
        &setup.amm.pubkey(),
        setup.sources,
        &setup.ve_supply,
        &setup.ve_program,
        &alice,
        (0, 1),
    )
    .unwrap();
    setup.send(ix, &[&minter]).await.unwrap();
}

#[tokio::test]
async fn test_kick_rejected_at_floor() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let alice = Pubkey::new_unique();
    setup.stake(&alice, 0, vec![WAD]).await;

    let ix = instruction::kick(
        &lm_gauge::id(),
        &setup.amm.pubkey(),
        setup.sources,
        &setup.ve_supply,
        &setup.ve_program,
        &alice,
        (0, 1),
    )
    .unwrap();
    let err = setup.send(ix, &[]).await.unwrap_err();
    assert_eq!(custom_error(err), 12);
}

#[tokio::test]
async fn test_set_killed_requires_authority() {
    let mut setup = Setup::start().await;
    setup.initialize().await;

    let stranger = Keypair::new();
    let ix = instruction::set_killed(
        &lm_gauge::id(),
        &stranger.pubkey(),
        &setup.amm.pubkey(),
        setup.sources,
        true,
    )
    .unwrap();
    let err = setup.send(ix, &[&stranger]).await.unwrap_err();
    assert_eq!(custom_error(err), 1);

    let authority = setup.context.payer.pubkey();
    let ix = instruction::set_killed(
        &lm_gauge::id(),
        &authority,
        &setup.amm.pubkey(),
        setup.sources,
        true,
    )
    .unwrap();
    setup.send(ix, &[]).await.unwrap();
    assert!(setup.gauge_state().await.is_killed);
}
