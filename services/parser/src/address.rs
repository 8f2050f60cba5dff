/// Separator placed between the street and suburb parts of an address.
pub const DEFAULT_SEPARATOR: &str = " ";

/// Join two address parts with a single space.
pub fn combine_address(part_1: &str, part_2: &str) -> String {
    combine_address_with(part_1, part_2, DEFAULT_SEPARATOR)
}

/// Join two address parts, putting `separator` between them only when both
/// are non-empty. The result is trimmed and every run of two or more
/// whitespace characters becomes one space.
pub fn combine_address_with(part_1: &str, part_2: &str, separator: &str) -> String {
    let part_1 = part_1.trim();
    let part_2 = part_2.trim();

    let joined = match (part_1.is_empty(), part_2.is_empty()) {
        (false, false) => format!("{}{}{}", part_1, separator, part_2),
        (false, true) => part_1.to_string(),
        (true, false) => part_2.to_string(),
        (true, true) => String::new(),
    };

    collapse_whitespace(joined.trim())
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = String::new();

    for c in s.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_run(&mut out, &mut run);
        out.push(c);
    }
    flush_run(&mut out, &mut run);

    out
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.chars().count() >= 2 {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}
