use console::Style;
use tilestitch_core::engine::{EngineKind, StitchedDatasetHandle};
use tilestitch_core::params::StitchingParameters;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }

    fn toggle(&self, enabled: bool) -> console::StyledObject<&'static str> {
        if enabled {
            self.method.apply_to("enabled")
        } else {
            self.disabled.apply_to("disabled")
        }
    }
}

pub fn print_parameter_summary(params: &StitchingParameters, engine: Option<EngineKind>) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Tile Stitching"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(14)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(params.input_folder().display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Format"),
        s.value.apply_to(params.output_format())
    );
    if let Some(engine) = engine {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Engine"),
            s.method.apply_to(engine)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Scan pattern"),
        s.value.apply_to(params.scan_pattern())
    );
    println!();

    println!("  {}", s.header.apply_to("Correction"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Flatfield"),
        s.toggle(params.apply_flatfield())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Registration"),
        s.toggle(params.use_registration())
    );
    if params.use_registration() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Channel"),
            s.value
                .apply_to(params.registration_channel().unwrap_or("first available"))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Z-level"),
            s.value.apply_to(params.registration_z_level())
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Mode"),
            s.method.apply_to(if params.dynamic_registration() {
                "dynamic"
            } else {
                "uniform"
            })
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Merging"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Timepoints"),
        s.toggle(params.merge_timepoints())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("HCS regions"),
        s.toggle(params.merge_hcs_regions())
    );
    println!();
}

pub fn print_outputs(handle: &StitchedDatasetHandle) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Output"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Folder"),
        s.path.apply_to(handle.output_dir.display())
    );
    for dataset in &handle.datasets {
        let [t, c, z, y, x] = dataset.shape;
        println!(
            "    {:<12}{}  {}",
            s.label.apply_to(&dataset.name),
            s.path.apply_to(dataset.path.display()),
            s.value.apply_to(format!(
                "t={t} c={c} z={z} {x}x{y}, {} level(s)",
                dataset.levels
            ))
        );
    }
    println!();
}
