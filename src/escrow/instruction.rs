//! Instruction chain for escrow initialization.

#![allow(deprecated)] // system_instruction deprecation - will migrate when solana_system_interface is stable

use anyhow::{Context, Result};
use borsh::BorshSerialize;
use solana_program::program_pack::Pack;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, system_program, sysvar,
};

use super::state::{anchor_discriminator, escrow_account_len};
use super::ProgramKind;

/// Space of an SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = spl_token::state::Account::LEN;

/// Instruction set of the native escrow program.
#[derive(BorshSerialize, Debug, Clone)]
pub enum NativeEscrowInstruction {
    InitEscrow { amount: u64 },
}

#[derive(BorshSerialize, Debug, Clone)]
struct InitEscrowArgs {
    expected_amount: u64,
}

/// Accounts taking part in escrow initialization.
#[derive(Debug, Clone)]
pub struct InitEscrowAccounts {
    /// Wallet opening the escrow; fee payer and token authority
    pub initializer: Pubkey,
    /// Initializer's token account the deposit comes from
    pub source_token_account: Pubkey,
    /// Mint of the source token account
    pub mint: Pubkey,
    /// Freshly generated temporary token account
    pub temp_token_account: Pubkey,
    /// Freshly generated escrow state account
    pub escrow_account: Pubkey,
    /// Initializer's token account that receives the counter-asset
    pub receiving_token_account: Pubkey,
}

/// Everything needed to build the instruction chain.
#[derive(Debug, Clone)]
pub struct InitEscrowPlan {
    pub program_id: Pubkey,
    pub kind: ProgramKind,
    pub accounts: InitEscrowAccounts,
    /// Tokens moved into the temporary account
    pub amount: u64,
    /// Counter-amount the initializer expects in return
    pub expected_amount: u64,
    /// Rent-exempt balance for a token account
    pub token_account_rent: u64,
    /// Rent-exempt balance for the escrow account (native programs only)
    pub escrow_account_rent: Option<u64>,
}

/// Builds the ordered instruction chain.
///
/// Anchor: create temp account, init temp account, transfer, init_escrow.
/// Native: the same, with the escrow account creation placed before init_escrow.
///
/// # Returns
///
/// * `Ok(Vec<Instruction>)` - Instructions in submission order
/// * `Err(anyhow::Error)` - Token instruction construction failed, or a native
///   plan is missing the escrow rent
pub fn build_init_escrow_instructions(plan: &InitEscrowPlan) -> Result<Vec<Instruction>> {
    let accounts = &plan.accounts;
    let token_program = spl_token::id();

    let create_temp_ix = system_instruction::create_account(
        &accounts.initializer,
        &accounts.temp_token_account,
        plan.token_account_rent,
        TOKEN_ACCOUNT_LEN as u64,
        &token_program,
    );

    let init_temp_ix = spl_token::instruction::initialize_account(
        &token_program,
        &accounts.temp_token_account,
        &accounts.mint,
        &accounts.initializer,
    )
    .context("Failed to build InitializeAccount instruction")?;

    let transfer_ix = spl_token::instruction::transfer(
        &token_program,
        &accounts.source_token_account,
        &accounts.temp_token_account,
        &accounts.initializer,
        &[],
        plan.amount,
    )
    .context("Failed to build Transfer instruction")?;

    let mut instructions = vec![create_temp_ix, init_temp_ix, transfer_ix];

    match plan.kind {
        ProgramKind::Anchor => {
            instructions.push(anchor_init_escrow_instruction(plan)?);
        }
        ProgramKind::Native => {
            let escrow_rent = plan
                .escrow_account_rent
                .context("Native escrow programs need the escrow account rent")?;
            instructions.push(system_instruction::create_account(
                &accounts.initializer,
                &accounts.escrow_account,
                escrow_rent,
                escrow_account_len(ProgramKind::Native) as u64,
                &plan.program_id,
            ));
            instructions.push(native_init_escrow_instruction(plan)?);
        }
    }

    Ok(instructions)
}

fn anchor_init_escrow_instruction(plan: &InitEscrowPlan) -> Result<Instruction> {
    let accounts = &plan.accounts;

    let mut data = anchor_discriminator("global", "init_escrow").to_vec();
    data.extend(
        InitEscrowArgs {
            expected_amount: plan.expected_amount,
        }
        .try_to_vec()
        .context("Failed to serialize init_escrow args")?,
    );

    Ok(Instruction {
        program_id: plan.program_id,
        accounts: vec![
            AccountMeta::new(accounts.escrow_account, true),
            AccountMeta::new(accounts.initializer, true),
            AccountMeta::new(accounts.temp_token_account, false),
            AccountMeta::new_readonly(accounts.receiving_token_account, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

fn native_init_escrow_instruction(plan: &InitEscrowPlan) -> Result<Instruction> {
    let accounts = &plan.accounts;

    Ok(Instruction {
        program_id: plan.program_id,
        accounts: vec![
            AccountMeta::new_readonly(accounts.initializer, true),
            AccountMeta::new(accounts.temp_token_account, false),
            AccountMeta::new_readonly(accounts.receiving_token_account, false),
            AccountMeta::new(accounts.escrow_account, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: NativeEscrowInstruction::InitEscrow {
            amount: plan.expected_amount,
        }
        .try_to_vec()
        .context("Failed to serialize InitEscrow instruction")?,
    })
}
