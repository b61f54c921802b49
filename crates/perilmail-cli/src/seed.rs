/// Generate and insert synthetic persons for targeting experiments.
///
/// With `reset`, existing persons are deleted first so repeated runs start
/// from a clean table instead of updating prior batches by email.
///
/// # Errors
///
/// Returns an error if a database query fails.
pub(crate) async fn run_seed(pool: &sqlx::PgPool, count: usize, reset: bool) -> anyhow::Result<()> {
    if reset {
        let removed = perilmail_db::delete_all_persons(pool).await?;
        println!("removed {removed} existing persons");
    }

    let (inserted, updated) = perilmail_db::seed_persons(pool, count).await?;
    let total = perilmail_db::count_persons(pool).await?;
    println!("seeded {inserted} new persons ({updated} updated), {total} total");

    Ok(())
}
