use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "table-cli", about = "Доступ к таблице: put, query, parallel scan")]
pub struct Cli {
    /// Путь к TOML конфиг файлу
    #[arg(long, global = true, default_value = "config.toml", env = "TABLE_CLI_CONFIG")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Записать (upsert) запись целиком
    Put(PutArgs),
    /// Найти записи по значению поля
    Query(QueryArgs),
    /// Прочитать всю таблицу параллельным scan'ом
    Scan(ScanArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PutArgs {
    /// Запись как JSON object
    #[arg(long)]
    pub item: String,
}

#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Имя поля
    pub field: String,
    /// Искомое значение (строка, если не задан --json)
    pub value: String,
    /// Трактовать value как JSON (число, bool, ...)
    #[arg(long)]
    pub json: bool,
    /// Strongly-consistent read
    #[arg(long)]
    pub consistent: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ScanArgs {
    /// Колонки проекции через запятую (без указания — записи целиком)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Оставить одну запись на каждое значение этого поля
    #[arg(long)]
    pub distinct_by: Option<String>,
}
