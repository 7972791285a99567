//! ECharts bar chart of monthly expenses.

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::bar,
};

use crate::analytics::MonthlyBucket;

/// The ECharts build loaded by [chart_page].
pub const ECHARTS_SCRIPT_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js";

/// Build a bar chart with one bar per bucket, oldest month on the left.
pub fn monthly_expenses_chart(buckets: &[MonthlyBucket]) -> Chart {
    let labels: Vec<String> = buckets.iter().map(|bucket| bucket.label.clone()).collect();
    let values: Vec<f64> = buckets.iter().map(|bucket| bucket.total).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Monthly Expenses")
                .subtext("Last six months"),
        )
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(bar::Bar::new().name("Expenses").data(values))
}

/// Wrap `chart` in a standalone HTML page that renders it with ECharts.
pub fn chart_page(chart: &Chart) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Monthly Expenses</title>
    <script src="{ECHARTS_SCRIPT_URL}"></script>
</head>
<body>
    <div id="monthly-expenses" style="width: 100%; min-height: 380px;"></div>
    <script>
        document.addEventListener('DOMContentLoaded', function() {{
            const chart = echarts.init(document.getElementById("monthly-expenses"));
            chart.setOption({options});
            window.addEventListener('resize', chart.resize);
        }});
    </script>
</body>
</html>
"#,
        options = chart
    )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR'
            });
            return currencyFormatter.format(number);",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
