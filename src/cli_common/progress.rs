//! Индикатор прогресса пакетного анализа

use indicatif::{ProgressBar, ProgressStyle};

const FILES_TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta})";

/// Прогресс по файлам; скрытый в тихом режиме
pub fn file_progress(total: u64, silent: bool) -> ProgressBar {
    if silent {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(FILES_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    bar.set_style(style);
    bar
}
