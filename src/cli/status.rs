use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = std::path::PathBuf::from(&settings.data_dir).join("capta.db");

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let rows: i64 = conn.query_row("SELECT count(*) FROM captacoes", [], |r| r.get(0))?;
        let clients: i64 = conn.query_row(
            "SELECT count(DISTINCT cod_cliente) FROM captacoes",
            [],
            |r| r.get(0),
        )?;
        let total: f64 = conn.query_row(
            "SELECT coalesce(sum(valor_captacao), 0.0) FROM captacoes",
            [],
            |r| r.get(0),
        )?;
        let range: (Option<String>, Option<String>) = conn.query_row(
            "SELECT min(data_captacao), max(data_captacao) FROM captacoes",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        println!();
        println!("Captações:  {rows}");
        println!("Clients:    {clients}");
        println!("Net total:  {}", money(total));
        if let (Some(from), Some(to)) = range {
            println!("Dates:      {from} to {to}");
        }
    } else {
        println!();
        println!("Database not found. Run `capta init` to set up.");
    }

    Ok(())
}
