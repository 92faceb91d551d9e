//! End-to-end integration tests
//!
//! These tests validate the complete command processing pipeline using
//! predefined CSV test fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Executes all commands through the ledger
//! 3. Generates the account report
//! 4. Compares actual output with expected.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path buy and sell flows
//! - Cancel flows
//! - Standing orders fired by quotes
//! - Error conditions (insufficient funds or stock, nothing pending, malformed rows)
//! - Interleaved users
//! - Replacement of pending and standing reservations
//! - Amounts below one cent
//!
//! Each test is run twice: once with the synchronous strategy and once with the async strategy.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_trading_ledger::cli::StrategyType;
    use rust_trading_ledger::strategy::{
        create_strategy, AsyncProcessingStrategy, BatchConfig, ProcessingStrategy,
        SyncProcessingStrategy,
    };
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a test fixture by processing input.csv and comparing with expected.csv
    ///
    /// This helper function:
    /// 1. Reads input.csv from tests/fixtures/{fixture_name}/
    /// 2. Executes all commands using the specified strategy
    /// 3. Generates output CSV to a temporary file
    /// 4. Reads expected.csv from the fixture directory
    /// 5. Compares actual output with expected output (normalized)
    ///
    /// # Arguments
    ///
    /// * `fixture_name` - Name of the fixture directory (e.g., "happy_path")
    /// * `strategy_type` - Processing strategy to use (Sync or Async)
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - Input or expected files cannot be read
    /// - Output doesn't match expected (after normalization)
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        // Construct paths to fixture files
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        // Verify fixture files exist
        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        // Create processing strategy
        let strategy = create_strategy(strategy_type, None);

        // Create temporary output file
        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        // Execute all commands using the selected strategy
        strategy
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to process commands: {}", e));

        // Flush output
        temp_output.flush().expect("Failed to flush temp file");

        // Read actual output from temp file
        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));

        // Read expected output
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    /// End-to-end test for all fixtures with both processing strategies
    #[rstest]
    #[case("happy_path")]
    #[case("cancel_flows")]
    #[case("standing_orders")]
    #[case("insufficient_and_invalid")]
    #[case("multiple_users")]
    #[case("replaced_reservation")]
    #[case("sub_cent_amounts")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }

    /// Deterministic script mixing every command kind across ten users, with
    /// quotes interleaved between user commands
    fn generated_script() -> String {
        let mut script = String::from("tx,command,user,stock,amount,quantity,price\n");
        let mut tx = 0;
        let mut row = |fields: String| {
            tx += 1;
            script.push_str(&format!("{},{}\n", tx, fields));
        };

        for u in 0..10 {
            row(format!("authenticate,u{},,,,", u));
            row(format!("add,u{},,1000.00,,", u));
        }
        for k in 0..600u32 {
            let user = format!("u{}", k % 10);
            let stock = ["S", "T", "U"][(k % 3) as usize];
            match k % 6 {
                0 => row(format!("buy,{},{},{}.00,{},", user, stock, k % 50 + 10, k % 5 + 1)),
                1 => row(format!("commit_buy,{},,,,", user)),
                2 => row(format!("set_buy_amount,{},{},30.00,,", user, stock)),
                3 => row(format!("set_buy_trigger,{},{},,,{}.00", user, stock, k % 20 + 5)),
                4 => row(format!("set_sell_amount,{},{},,1,", user, stock)),
                _ => row(format!("set_sell_trigger,{},{},,,{}.50", user, stock, k % 9 + 4)),
            }
            if k % 13 == 0 {
                row(format!("quote,,{},,,{}.25", stock, k % 17 + 3));
            }
        }

        script
    }

    #[test]
    fn test_strategies_agree_on_generated_script() {
        let mut input = NamedTempFile::new().expect("Failed to create temp file");
        input
            .write_all(generated_script().as_bytes())
            .expect("Failed to write script");
        input.flush().expect("Failed to flush script");

        let mut sync_output = Vec::new();
        SyncProcessingStrategy
            .process(input.path(), &mut sync_output)
            .unwrap();

        // A small odd batch size puts batch boundaries everywhere
        let mut async_output = Vec::new();
        AsyncProcessingStrategy::new(BatchConfig::new(7, 4))
            .process(input.path(), &mut async_output)
            .unwrap();

        assert_eq!(
            String::from_utf8(sync_output).unwrap(),
            String::from_utf8(async_output).unwrap()
        );
    }
}
