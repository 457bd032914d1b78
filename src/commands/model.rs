use super::open_predictor;
use crate::cli::{ImportanceArgs, OutputFormat, PredictArgs, TrainArgs};
use crate::config::Config;
use crate::forecast::{Metrics, TrainOptions};
use crate::utils::error::{FlowResult, handle_flow};
use crate::utils::format::{format_bcb_date, format_datetime, format_value};
use crate::utils::{Align, OutputStyle, Table, print_info, print_json, print_success};
use anyhow::{Result, bail};

pub async fn handle_train_command(mut config: Config, args: &TrainArgs) -> Result<()> {
    let catalog = config.catalog();
    catalog.require(&args.indicator)?;

    if let Some(trees) = args.trees {
        if trees == 0 {
            bail!("--trees must be greater than 0");
        }
        config.ml.n_estimators = trees;
    }

    let mut options = TrainOptions::from(&config.ml);
    if let Some(test_size) = args.test_size {
        options.test_size = test_size;
    }
    if let Some(window) = args.window {
        options.window = window;
    }

    let predictor = open_predictor(&config).await?;
    print_info(&format!(
        "Training random forest for {} ({} trees, window {}, test size {:.0}%)...",
        catalog.display_name(&args.indicator),
        config.ml.n_estimators,
        options.window,
        options.test_size * 100.0
    ));

    let metrics = predictor.train(&args.indicator, options).await?;
    print_metrics(&metrics);
    print_success(&format!(
        "Model saved to {}",
        predictor.model_path(&args.indicator).display()
    ));
    Ok(())
}

fn print_metrics(metrics: &Metrics) {
    println!();
    OutputStyle::print_header("🎯 Hold-out Metrics");
    OutputStyle::print_field_colored("R²", &format!("{:.4}", metrics.r2), OutputStyle::number);
    OutputStyle::print_field_colored("RMSE", &format!("{:.4}", metrics.rmse), OutputStyle::number);
    OutputStyle::print_field_colored("MAE", &format!("{:.4}", metrics.mae), OutputStyle::number);
    OutputStyle::print_field_colored("Train samples", &metrics.samples_train.to_string(), OutputStyle::muted);
    OutputStyle::print_field_colored("Test samples", &metrics.samples_test.to_string(), OutputStyle::muted);
    println!();
}

pub async fn handle_predict_command(config: Config, args: &PredictArgs) -> Result<()> {
    let catalog = config.catalog();
    catalog.require(&args.indicator)?;

    let predictor = open_predictor(&config).await?;
    let forecast = predictor.predict_future(&args.indicator, args.steps as usize).await?;

    if args.format == OutputFormat::Json {
        print_json(&forecast)?;
        return Ok(());
    }

    let status = predictor.model_status(&args.indicator);
    OutputStyle::print_header(&format!("🔮 {} Forecast", catalog.display_name(&args.indicator)));
    OutputStyle::print_field_colored("Last observed", &format_bcb_date(&forecast.last_observed), OutputStyle::date);
    if let Some(trained_at) = status.trained_at {
        OutputStyle::print_field_colored("Model trained", &format_datetime(&trained_at), OutputStyle::date);
    }
    if let Some(metrics) = status.metrics {
        OutputStyle::print_field_colored("Hold-out R²", &format!("{:.4}", metrics.r2), OutputStyle::number);
    }
    println!();

    let mut table = Table::new(&["Date", "Forecast"]).align(1, Align::Right);
    for point in &forecast.points {
        table.add_row(vec![format_bcb_date(&point.date), format_value(point.value)]);
    }
    table.print()?;
    Ok(())
}

pub async fn handle_importance_command(config: Config, args: &ImportanceArgs) -> Result<()> {
    let catalog = config.catalog();
    catalog.require(&args.indicator)?;

    let predictor = open_predictor(&config).await?;
    let mut importances = predictor.feature_importance(&args.indicator)?;
    if let Some(top) = args.top {
        importances.truncate(top);
    }
    if importances.is_empty() {
        handle_flow(FlowResult::EmptyList {
            item_type: "feature importances".to_string(),
        });
        return Ok(());
    }

    OutputStyle::print_header(&format!("🧮 Feature Importance: {}", catalog.display_name(&args.indicator)));
    let mut table = Table::new(&["Feature", "Importance", ""]).align(1, Align::Right);
    for (feature, importance) in &importances {
        table.add_row(vec![
            feature.clone(),
            format!("{:.4}", importance),
            "█".repeat((importance * 40.0).round() as usize),
        ]);
    }
    table.print()?;
    Ok(())
}
