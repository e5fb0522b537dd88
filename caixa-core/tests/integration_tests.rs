//! Integration tests for caixa-core services
//!
//! Every test runs against a real DuckDB file in a temporary directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use caixa_core::domain::result::Error;
use caixa_core::domain::{
    Actor, AuditAction, AuditStatus, Direction, ImportJobStatus, Period, User, UserRole,
};
use caixa_core::ingest::IngestError;
use caixa_core::services::{ManualEntry, TransactionFilter};
use caixa_core::CaixaContext;

// ============================================================================
// Test Helpers
// ============================================================================

const ASAAS_MARCH: &str = "Relatório de movimentações\n\
Período: 01/03/2025 a 31/03/2025\n\
Data;Descrição;Valor;Saldo\n\
05/03/2025;Pix recebido Cliente A;1.500,00;1.500,00\n\
06/03/2025;Tarifa Pix;-1,99;1.498,01\n\
10/03/2025;Pagamento fornecedor;-200,00;1.298,01\n\
10/03/2025;Saldo do dia;1.298,01;1.298,01\n";

fn create_context(temp_dir: &TempDir) -> CaixaContext {
    CaixaContext::new(temp_dir.path()).expect("Failed to create context")
}

fn march() -> Period {
    Period::new(2025, 3).unwrap()
}

fn import_march(ctx: &CaixaContext, actor: &Actor) -> caixa_core::services::ImportReport {
    ctx.import_service
        .import_content(ASAAS_MARCH, "extrato-marco.csv", "asaas", actor)
        .expect("import failed")
}

fn manual(date: (i32, u32, u32), description: &str, cents: i64, direction: Direction, category: Option<&str>) -> ManualEntry {
    ManualEntry {
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        description: description.to_string(),
        amount: Decimal::new(cents, 2),
        direction,
        category: category.map(|c| c.to_string()),
        observations: None,
    }
}

fn admin(ctx: &CaixaContext) -> Actor {
    let outcome = ctx
        .user_service
        .provision_admin("Ana Souza", "ana@escritorio.com", "senha-forte-1", &Actor::system())
        .unwrap();
    Actor::from(&outcome.user)
}

fn domain_error(err: &anyhow::Error) -> Option<&Error> {
    err.downcast_ref::<Error>()
}

// ============================================================================
// Import & deduplication
// ============================================================================

#[test]
fn test_reimport_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();

    let first = import_march(&ctx, &actor);
    assert_eq!(first.produced, 3);
    assert_eq!(first.skipped, 1);
    assert_eq!(first.inserted, 3);
    assert_eq!(first.ignored, 0);
    assert_eq!(first.status, ImportJobStatus::Completed);
    assert_eq!(first.period_start, NaiveDate::from_ymd_opt(2025, 3, 5));
    assert_eq!(first.period_end, NaiveDate::from_ymd_opt(2025, 3, 10));

    let second = import_march(&ctx, &actor);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.ignored, 3);
    assert_eq!(second.status, ImportJobStatus::CompletedWithAlerts);

    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 3);
    assert_eq!(ctx.import_service.list_jobs(10).unwrap().len(), 2);
}

#[test]
fn test_other_layout_of_same_statement_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    import_march(&ctx, &Actor::system());

    // Comma separated, columns reordered, extra spaces in the description
    let other_export = "Descrição,Data,Valor\n\
\"Pix recebido   Cliente A\",05/03/2025,\"1.500,00\"\n\
\"Tarifa  Pix\",2025-03-06,\"-1,99\"\n";

    let report = ctx
        .import_service
        .import_content(other_export, "extrato.csv", "ASAAS", &Actor::system())
        .unwrap();
    assert_eq!(report.produced, 2);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.ignored, 2);
}

#[test]
fn test_imported_rows_keep_captured_values() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    import_march(&ctx, &Actor::system());

    let rows = ctx.ledger_service.list(march(), &TransactionFilter::default()).unwrap();
    assert_eq!(rows.len(), 3);

    let fee = rows.iter().find(|t| t.description == "Tarifa Pix").unwrap();
    assert_eq!(fee.amount, Decimal::new(199, 2));
    assert_eq!(fee.direction, Direction::Outgoing);
    assert_eq!(fee.category, "Taxas e Tarifas");
    assert_eq!(fee.source, "ASAAS");
    assert_eq!(fee.confidence_score, 80);
    assert_eq!(fee.balance, Decimal::new(149801, 2));
    assert_eq!(fee.original_amount, fee.amount);
    assert_eq!(fee.audit_status, AuditStatus::Pending);
    assert!(fee.import_id.is_some());

    let incoming = TransactionFilter {
        direction: Some(Direction::Incoming),
        ..Default::default()
    };
    let received = ctx.ledger_service.list(march(), &incoming).unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].category, "Recebimento Cliente");
}

#[test]
fn test_preview_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let preview = ctx.import_service.preview(ASAAS_MARCH, "asaas").unwrap();
    assert_eq!(preview.transactions_produced, 3);
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 0);
    assert!(ctx.import_service.list_jobs(10).unwrap().is_empty());
}

#[test]
fn test_failed_import_is_recorded() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let err = ctx
        .import_service
        .import_content("Resumo do mês\nTotal;1.298,01\n", "resumo.csv", "asaas", &Actor::system())
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<IngestError>(), Some(IngestError::HeaderNotFound { .. })));

    let jobs = ctx.import_service.list_jobs(10).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, ImportJobStatus::Failed);
    assert!(jobs[0].error_message.is_some());
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 0);
}

#[test]
fn test_import_from_file_strips_bom() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let path = temp_dir.path().join("extrato.csv");
    std::fs::write(&path, format!("\u{feff}{}", ASAAS_MARCH)).unwrap();

    let report = ctx.import_service.import_file(&path, "asaas", &Actor::system()).unwrap();
    assert_eq!(report.inserted, 3);
    let job = ctx.import_service.get_job(&report.job_id.to_string()).unwrap();
    assert_eq!(job.file_name, "extrato.csv");
}

#[test]
fn test_preview_file_reads_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let path = temp_dir.path().join("extrato.csv");
    std::fs::write(&path, ASAAS_MARCH).unwrap();

    let preview = ctx.import_service.preview_file(&path, "asaas").unwrap();
    assert_eq!(preview.transactions_produced, 3);
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 0);
}

// ============================================================================
// Import jobs
// ============================================================================

#[test]
fn test_delete_job_removes_only_its_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();

    let report = import_march(&ctx, &actor);
    ctx.manual_service
        .add(&manual((2025, 3, 20), "Aluguel sala", 120000, Direction::Outgoing, Some("Aluguel")), &actor)
        .unwrap();

    let removed = ctx.import_service.delete_job(&report.job_id.to_string(), &actor).unwrap();
    assert_eq!(removed, 3);
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 1);

    let err = ctx.import_service.get_job(&report.job_id.to_string()).unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::NotFound(_))));
}

#[test]
fn test_delete_job_refused_in_closed_period() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();

    let report = import_march(&ctx, &actor);
    ctx.closing_service.finalize(march(), &actor).unwrap();

    assert!(ctx.import_service.delete_job(&report.job_id.to_string(), &actor).is_err());
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 3);
}

// ============================================================================
// Period closing
// ============================================================================

#[test]
fn test_finalize_freezes_totals_and_audits_rows() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);

    let closing = ctx.closing_service.finalize(march(), &actor).unwrap();
    assert!(closing.is_closed);
    assert_eq!(closing.summary.total_in, Decimal::new(150000, 2));
    assert_eq!(closing.summary.total_out, Decimal::new(20199, 2));
    assert_eq!(closing.summary.result, Decimal::new(129801, 2));
    assert_eq!(closing.summary.transaction_count, 3);
    assert_eq!(closing.summary.pending_audit_count, 3);

    let status = ctx.closing_service.status(march()).unwrap();
    assert!(status.closing.is_closed);
    assert_eq!(status.closing.summary.result, Decimal::new(129801, 2));
    assert_eq!(status.live.pending_audit_count, 0);

    let err = ctx.closing_service.finalize(march(), &actor).unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::PeriodClosed(_))));
}

#[test]
fn test_closed_period_locks_imports_and_edits() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);
    let key = ctx.ledger_service.list(march(), &TransactionFilter::default()).unwrap()[0]
        .transaction_key
        .clone();

    ctx.closing_service.finalize(march(), &actor).unwrap();

    let again = import_march(&ctx, &actor);
    assert_eq!(again.locked, 3);
    assert_eq!(again.inserted, 0);
    assert_eq!(again.status, ImportJobStatus::CompletedWithAlerts);

    let err = ctx.ledger_service.update_category(&key, "Aluguel", None, &actor).unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::PeriodClosed(p)) if p == "2025-03"));

    let err = ctx
        .manual_service
        .add(&manual((2025, 3, 31), "Ajuste", 1000, Direction::Incoming, None), &actor)
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::PeriodClosed(_))));

    assert!(ctx.closing_service.reset(march(), &actor).is_err());
}

#[test]
fn test_reopen_requires_admin() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    import_march(&ctx, &Actor::system());
    ctx.closing_service.finalize(march(), &Actor::system()).unwrap();

    let err = ctx
        .closing_service
        .reopen(march(), Some("ajuste"), &Actor::system())
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::Forbidden(_))));

    let admin = admin(&ctx);
    ctx.closing_service.reopen(march(), Some("nota fiscal atrasada"), &admin).unwrap();
    assert!(!ctx.repository.is_period_closed(march()).unwrap());

    let entries = ctx.audit_service.recent(10).unwrap();
    let reopen = entries.iter().find(|e| e.action == AuditAction::ReopenPeriod).unwrap();
    assert_eq!(reopen.user_id.as_deref(), Some("ana@escritorio.com"));
    assert_eq!(reopen.reason.as_deref(), Some("nota fiscal atrasada"));
}

#[test]
fn test_reset_period() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);
    ctx.snapshot_service.create(march(), Some("antes"), &actor).unwrap();

    let outcome = ctx.closing_service.reset(march(), &actor).unwrap();
    assert_eq!(outcome.transactions_deleted, 3);
    assert_eq!(outcome.snapshots_deleted, 1);
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 0);
    assert!(ctx.snapshot_service.list(Some(march())).unwrap().is_empty());
}

// ============================================================================
// Ledger edits
// ============================================================================

#[test]
fn test_edits_keep_key_and_originals() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);

    let filter = TransactionFilter {
        search: Some("fornecedor".into()),
        ..Default::default()
    };
    let tx = ctx.ledger_service.list(march(), &filter).unwrap().remove(0);

    let updated = ctx
        .ledger_service
        .update_category(&tx.transaction_key, "Fornecedores", Some("conferido"), &actor)
        .unwrap();
    assert_eq!(updated.transaction_key, tx.transaction_key);
    assert_eq!(updated.category, "Fornecedores");
    assert_eq!(updated.original_category, "Outros");
    assert!(updated.is_recategorized());

    let observed = ctx
        .ledger_service
        .update_observations(&tx.transaction_key, Some("  NF 123  "), &actor)
        .unwrap();
    assert_eq!(observed.observations.as_deref(), Some("NF 123"));

    let audited = ctx.ledger_service.mark_audited(&tx.transaction_key, &actor).unwrap();
    assert_eq!(audited.audit_status, AuditStatus::Audited);

    let history = ctx.audit_service.for_transaction(&tx.transaction_key, 10).unwrap();
    assert_eq!(history.len(), 3);
    let recategorized = history.iter().find(|e| e.action == AuditAction::UpdateCategory).unwrap();
    assert_eq!(recategorized.old_value.as_deref(), Some("Outros"));
    assert_eq!(recategorized.new_value.as_deref(), Some("Fornecedores"));
    assert_eq!(recategorized.reason.as_deref(), Some("conferido"));
}

#[test]
fn test_unknown_key_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let err = ctx
        .ledger_service
        .mark_audited("does-not-exist", &Actor::system())
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::NotFound(_))));
}

// ============================================================================
// Manual entries
// ============================================================================

#[test]
fn test_manual_entry_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    let entry = manual((2025, 3, 15), "Tarifa boleto", 350, Direction::Outgoing, None);

    let first = ctx.manual_service.add(&entry, &actor).unwrap();
    assert!(first.inserted);
    assert_eq!(first.transaction.source, "MANUAL");
    assert_eq!(first.transaction.confidence_score, 100);
    assert_eq!(first.transaction.category, "Taxas e Tarifas");
    assert!(first.transaction.transaction_key.starts_with("MANUAL_2025-03-15_3.50_OUTGOING_"));

    let second = ctx.manual_service.add(&entry, &actor).unwrap();
    assert!(!second.inserted);
    assert_eq!(second.transaction.transaction_key, first.transaction.transaction_key);
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 1);
}

#[test]
fn test_manual_entry_notes_suggested_category() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();

    ctx.manual_service
        .add(&manual((2025, 3, 15), "Tarifa boleto", 350, Direction::Outgoing, None), &actor)
        .unwrap();
    ctx.manual_service
        .add(&manual((2025, 3, 16), "Aluguel sala", 120000, Direction::Outgoing, Some("Aluguel")), &actor)
        .unwrap();

    let entries = ctx.audit_service.recent(10).unwrap();
    let manual_entries: Vec<_> = entries.iter().filter(|e| e.action == AuditAction::ManualEntry).collect();
    assert_eq!(manual_entries.len(), 2);
    let suggested = manual_entries.iter().find(|e| e.details.contains("Tarifa boleto")).unwrap();
    assert!(suggested.details.contains("category suggested by rules"));
    let chosen = manual_entries.iter().find(|e| e.details.contains("Aluguel sala")).unwrap();
    assert!(!chosen.details.contains("suggested"));
}

#[test]
fn test_manual_entry_validation() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let zero = manual((2025, 3, 15), "Nada", 0, Direction::Outgoing, None);
    let err = ctx.manual_service.add(&zero, &Actor::system()).unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::Validation(_))));

    let blank = manual((2025, 3, 15), "   ", 100, Direction::Outgoing, None);
    assert!(ctx.manual_service.add(&blank, &Actor::system()).is_err());
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_restore_counts() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();

    let report = import_march(&ctx, &actor);
    let rent = ctx
        .manual_service
        .add(&manual((2025, 3, 20), "Aluguel sala", 120000, Direction::Outgoing, Some("Aluguel")), &actor)
        .unwrap()
        .transaction;

    let snapshot = ctx.snapshot_service.create(march(), Some("fechamento prévio"), &actor).unwrap();
    assert_eq!(snapshot.tx_count, 4);
    let details = ctx.snapshot_service.details(&snapshot.id.to_string()).unwrap();
    assert_eq!(details.items.len(), 4);

    // Drift away from the snapshot
    ctx.ledger_service
        .update_category(&rent.transaction_key, "Infraestrutura", None, &actor)
        .unwrap();
    ctx.import_service.delete_job(&report.job_id.to_string(), &actor).unwrap();
    ctx.manual_service
        .add(&manual((2025, 3, 25), "Lançamento errado", 999, Direction::Incoming, Some("Outros")), &actor)
        .unwrap();

    let log = ctx
        .snapshot_service
        .restore(&snapshot.id.to_string(), "desfazer exclusão", &actor)
        .unwrap();
    assert_eq!(log.counts.deleted_count, 1);
    assert_eq!(log.counts.inserted_count, 3);
    assert_eq!(log.counts.updated_count, 1);

    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 4);
    let restored_rent = ctx.ledger_service.get(&rent.transaction_key).unwrap();
    assert_eq!(restored_rent.category, "Aluguel");
    assert_eq!(restored_rent.id, rent.id);

    let logs = ctx.snapshot_service.restore_logs(Some(march())).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].counts, log.counts);
    assert_eq!(logs[0].reason, "desfazer exclusão");
}

#[test]
fn test_restore_refused_when_closed() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);

    let snapshot = ctx.snapshot_service.create(march(), None, &actor).unwrap();
    ctx.closing_service.finalize(march(), &actor).unwrap();

    let err = ctx
        .snapshot_service
        .restore(&snapshot.id.to_string(), "teste", &actor)
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(Error::PeriodClosed(_))));
}

#[test]
fn test_delete_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);

    let snapshot = ctx.snapshot_service.create(march(), None, &actor).unwrap();
    ctx.snapshot_service.delete(&snapshot.id.to_string(), &actor).unwrap();

    assert!(ctx.snapshot_service.list(None).unwrap().is_empty());
    assert_eq!(ctx.repository.check_orphaned_snapshot_items().unwrap(), 0);
    assert!(ctx.snapshot_service.get(&snapshot.id.to_string()).is_err());
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_report_excludes_non_impacting_categories() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);
    ctx.manual_service
        .add(&manual((2025, 3, 28), "Retirada sócio", 50000, Direction::Outgoing, Some("Retirada de lucro")), &actor)
        .unwrap();

    let summary = ctx.report_service.period_summary(march()).unwrap();
    assert_eq!(summary.total_in, Decimal::new(150000, 2));
    assert_eq!(summary.total_out, Decimal::new(70199, 2));
    assert_eq!(summary.total_out_non_impacting, Decimal::new(50000, 2));
    assert_eq!(summary.result, Decimal::new(129801, 2));
    assert_eq!(summary.transaction_count, 4);

    let withdrawal = summary.outgoing.iter().find(|c| c.category == "Retirada de lucro").unwrap();
    assert!(!withdrawal.impacts_result);
    assert_eq!(summary.outgoing[0].category, "Retirada de lucro");
}

#[test]
fn test_evolution_covers_twelve_months() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();
    import_march(&ctx, &actor);
    ctx.manual_service
        .add(&manual((2025, 4, 2), "Honorários", 300000, Direction::Incoming, Some("Honorários")), &actor)
        .unwrap();

    let evolution = ctx.report_service.evolution(2025).unwrap();
    assert_eq!(evolution.months.len(), 12);
    assert_eq!(evolution.months[0].transaction_count, 0);
    assert_eq!(evolution.months[2].result, Decimal::new(129801, 2));
    assert_eq!(evolution.months[3].total_in, Decimal::new(300000, 2));
    assert_eq!(evolution.result, Decimal::new(429801, 2));
}

#[test]
fn test_export_csv() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    import_march(&ctx, &Actor::system());

    let mut buffer = Vec::new();
    let written = ctx.report_service.export_csv(march(), &mut buffer).unwrap();
    assert_eq!(written, 3);

    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("date,description,type,amount"));
    assert!(text.contains("2025-03-06,Tarifa Pix,OUTGOING,1.99,Taxas e Tarifas"));
}

// ============================================================================
// Users & sources
// ============================================================================

#[test]
fn test_provision_admin_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let first = ctx
        .user_service
        .provision_admin("Ana Souza", "Ana@Escritorio.com", "senha-forte-1", &Actor::system())
        .unwrap();
    assert!(first.created);
    assert_eq!(first.user.email, "ana@escritorio.com");
    assert_eq!(first.user.role, UserRole::Admin);

    let second = ctx
        .user_service
        .provision_admin("Outro Nome", "ana@escritorio.com", "outra-senha-2", &Actor::system())
        .unwrap();
    assert!(!second.created);
    assert!(!second.updated);
    assert_eq!(second.user.name, "Ana Souza");

    // Password untouched by the second call
    assert!(ctx.user_service.verify_password("ana@escritorio.com", "senha-forte-1").unwrap());
    assert!(!ctx.user_service.verify_password("ana@escritorio.com", "outra-senha-2").unwrap());
    assert_eq!(ctx.user_service.list().unwrap().len(), 1);
}

#[test]
fn test_provision_promotes_existing_operator() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let mut operator = User::new("u-1", "Bruno", "bruno@escritorio.com", UserRole::Operator);
    operator.active = false;
    ctx.repository.insert_user(&operator, "hash", "c2FsdA==").unwrap();

    let outcome = ctx
        .user_service
        .provision_admin("Bruno", "bruno@escritorio.com", "irrelevante", &Actor::system())
        .unwrap();
    assert!(outcome.updated);
    assert_eq!(outcome.user.role, UserRole::Admin);
    assert!(outcome.user.active);

    let actor = ctx.user_service.resolve_actor(Some("bruno@escritorio.com")).unwrap();
    assert!(actor.is_admin());
    assert!(ctx.user_service.resolve_actor(Some("nobody@escritorio.com")).is_err());
    assert_eq!(ctx.user_service.resolve_actor(None).unwrap(), Actor::system());
}

#[test]
fn test_sources() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let actor = Actor::system();

    let ids: Vec<String> = ctx.source_service.list().unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["ASAAS".to_string(), "MANUAL".to_string()]);

    let inter = ctx.source_service.add("Banco Inter", &actor).unwrap();
    assert_eq!(inter.id, "BANCO_INTER");
    assert_eq!(ctx.source_service.add("banco  inter", &actor).unwrap().id, "BANCO_INTER");
    assert_eq!(ctx.source_service.list().unwrap().len(), 3);

    import_march(&ctx, &actor);
    assert!(ctx.source_service.remove("ASAAS", &actor).is_err());
    assert!(ctx.source_service.remove("MANUAL", &actor).is_err());
    ctx.source_service.remove("Banco Inter", &actor).unwrap();
    assert_eq!(ctx.source_service.list().unwrap().len(), 2);
}

// ============================================================================
// Status & doctor
// ============================================================================

#[test]
fn test_status_and_doctor_on_fresh_import() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    import_march(&ctx, &Actor::system());

    let status = ctx.status_service.get_status().unwrap();
    assert_eq!(status.total_transactions, 3);
    assert_eq!(status.date_range.earliest.as_deref(), Some("2025-03-05"));
    assert_eq!(status.periods.len(), 1);
    assert!(!status.periods[0].is_closed);
    assert!(status.last_import.is_some());

    let doctor = ctx.doctor_service.run_checks().unwrap();
    assert_eq!(doctor.summary.errors, 0);
    assert_eq!(doctor.summary.warnings, 0);
}

#[test]
fn test_context_reopens_existing_database() {
    let temp_dir = TempDir::new().unwrap();
    {
        let ctx = create_context(&temp_dir);
        import_march(&ctx, &Actor::system());
    }
    let ctx = create_context(&temp_dir);
    assert_eq!(ctx.repository.get_transaction_count().unwrap(), 3);
}
