//! Terminal styling utilities

pub fn style_cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}

pub fn style_green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}

pub fn style_red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

pub fn style_yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}

pub fn style_dim(s: &str) -> String {
    format!("\x1b[2m{}\x1b[0m", s)
}

pub fn style_bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

pub fn print_success(msg: &str) {
    println!("{} {}", style_green("✓"), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", style_red("✗"), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", style_yellow("⚠"), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", style_cyan("ℹ"), msg);
}

pub fn print_header(title: &str) {
    println!();
    println!("{}", style_bold(title));
    println!("{}", "─".repeat(title.chars().count()));
}

/// Shorten an address for tables: first 6 and last 4 characters
pub fn truncate_address(address: &str) -> String {
    if address.len() >= 12 {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// Group digits in thousands for readability
pub fn format_amount(amount: u128) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('_');
        }
        out.push(c);
    }
    out
}
