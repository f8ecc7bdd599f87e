use std::fs;

use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use r2pandas::{Config, DiagnosticKind, Translation, normalize_identifier, translate};
use tempfile::TempDir;

fn translate_default(source: &str) -> Translation {
    translate(source, &Config::default()).unwrap()
}

fn single_line(source: &str) -> String {
    translate_default(source).text.trim_end().to_owned()
}

#[test]
fn test_column_access_is_normalized() {
    assert_eq!(single_line("v <- df$col.1"), r#"v = df["col_1"]"#);
}

#[test]
fn test_literal_range() {
    assert_eq!(single_line("r <- 1:5"), "r = range(1, 6)");
}

#[test]
fn test_chained_null_assignment_becomes_drop() {
    assert_eq!(
        single_line("a$curt.prt <- a$curt.rt.x <- NULL"),
        r#"a = a.drop(columns=["curt_prt", "curt_rt_x"])"#
    );
}

#[test]
fn test_subset_condition() {
    assert_eq!(
        single_line("res <- subset(df, (age >= 21 & !is.na(city)) | (score %in% c(90, 95)))"),
        r#"res = df[((df["age"] >= 21) & df["city"].notna()) | (df["score"].isin([90, 95]))]"#
    );
}

#[test]
fn test_dual_key_outer_merge() {
    assert_eq!(
        single_line(r#"m <- merge(x, y, by.x="a", by.y="b", all=TRUE)"#),
        r#"m = pd.merge(x, y, left_on="a", right_on="b", how="outer")"#
    );
}

#[test]
fn test_join_kind_precedence() {
    let cases = [
        ("all = TRUE, all.x = FALSE", "outer"),
        ("all.x = TRUE", "left"),
        ("all.y = TRUE", "right"),
        ("all.x = TRUE, all.y = TRUE", "outer"),
        ("all.x = FALSE", "inner"),
    ];
    for (flags, how) in cases {
        let out = single_line(&format!(r#"m <- merge(a, b, by = "k", {flags})"#));
        assert_eq!(out, format!(r#"m = pd.merge(a, b, on="k", how="{how}")"#));
    }
}

#[test]
fn test_chain_determinism() {
    let out = translate_default("a$a <- NULL\na$b <- a$a <- NULL\na$c <- NULL\n");
    assert_eq!(out.text, "a = a.drop(columns=[\"a\", \"b\", \"c\"])\n");
}

#[test]
fn test_literals_survive_verbatim() {
    let literals = [
        r#""x$y <- NULL""#,
        r#"'1:5 %in% c(TRUE)'"#,
        r#""if (a) { b }""#,
        r#""escaped \" quote""#,
    ];
    for literal in literals {
        let out = translate_default(&format!("s <- {literal} # keep {literal}\n"));
        assert_eq!(out.text, format!("s = {literal} # keep {literal}\n"));
        assert!(out.diagnostics.is_empty());
    }
}

#[test]
fn test_unterminated_literal_is_not_fatal() {
    let out = translate_default("s <- \"open\nx <- 1\n");
    assert_eq!(out.text, "s = \"open\nx = 1\n");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnterminatedLiteral);
}

#[test]
fn test_unbalanced_blocks() {
    let failure = translate("f <- function(x) {\n  x\n", &Config::default()).unwrap_err();
    assert!(
        failure
            .diagnostics
            .iter()
            .any(|d| d.is_error() && d.kind == DiagnosticKind::BlockBalance)
    );

    let out = translate_default("x <- 1\n}\ny <- 2\n");
    assert_eq!(out.text, "x = 1\ny = 2\n");
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::BlockBalance);
    assert!(!out.diagnostics[0].is_error());
}

#[test]
fn test_block_layouts() {
    let source = "\
f <- function(x)
{
  if (x)
    # why
    x <- 1
  if (x) {
  }
}
";
    let out = translate_default(source);
    assert!(out.diagnostics.is_empty());
    assert_eq!(
        out.text,
        "def f(x):\n    if x:\n        # why\n        x = 1\n    if x:\n        pass\n"
    );
}

#[test]
fn test_missing_value_is_assigned_not_dropped() {
    let out = translate_default("df$flag <- NA\n");
    assert_eq!(out.text, "df[\"flag\"] = None\n");
}

#[test]
fn test_normalization_is_idempotent() {
    for name in ["col.1", "totalAmt", "Order.Date", "already_fine", "x2Y", "a-b.C"] {
        let once = normalize_identifier(name);
        assert_eq!(normalize_identifier(&once), once);
    }
}

#[test]
fn test_config_file_enables_normalization() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("r2pandas.toml");
    fs::write(
        &path,
        "aggressive-identifier-normalization = true\nnormalize-literal-column-strings = true\n",
    )
    .unwrap();
    let config = Config::load_layers(&[], Some(&path), |_| None).unwrap();

    let out = translate("myFrame$Total.Amt <- oldTotal * 2\n", &config).unwrap();
    assert_eq!(out.text, "my_frame[\"total_amt\"] = old_total * 2\n");

    let out = translate("m <- merge(a, b, by = \"Cust.ID\")\n", &config).unwrap();
    assert_eq!(out.text, "m = pd.merge(a, b, on=\"cust_id\", how=\"inner\")\n");
}

#[test]
fn test_script_translation() {
    let source = r#"# clean the orders table
orders <- read.csv("orders.csv")
orders$Order.Date <- NULL
orders$tmp.col <- NULL
big <- subset(orders, amount > 100 & !is.na(region))
for (i in 1:nrow(big)) {
  if (big$amount[i] > 1000) {
    print("large")
  } else {
    next
  }
}
joined <- merge(big, customers, by = "cust.id", all.x = TRUE)
"#;
    let out = translate_default(source);
    assert!(out.diagnostics.is_empty());
    assert_snapshot!(out.text.trim_end(), @r#"
    # clean the orders table
    orders = read.csv("orders.csv")
    orders = orders.drop(columns=["order_date", "tmp_col"])
    big = orders[(orders["amount"] > 100) & orders["region"].notna()]
    for i in range(1, len(big) + 1):
        if big["amount"][i] > 1000:
            print("large")
        else:
            continue
    joined = pd.merge(big, customers, on="cust.id", how="left")
    "#);
}
