use {
    anyhow::{anyhow, Error},
    log::trace,
    std::rc::Rc,
    structopt::StructOpt,
    xlib_xrandr::{
        geometry, ConnectionState, Connection, CrtcField, OutputField, RRCrtc, RROutput,
        Resource, Value,
    },
};

/// Accepts decimal or `0x`-prefixed resource ids, as xrandr prints them.
fn parse_xid(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[derive(StructOpt)]
struct GlobalOptions {
    /// X display to connect to; defaults to $DISPLAY
    #[structopt(long)]
    display: Option<String>,
}

impl GlobalOptions {
    fn connect(&self) -> Result<Rc<Connection>, Error> {
        let cm = Connection::open(self.display.as_deref())?;
        if cm.query_extension()?.is_none() {
            return Err(anyhow!("RandR extension is not available on this display"));
        }
        let (_, major, minor) = cm.query_version()?;
        trace!("RandR {}.{}", major, minor);
        Ok(cm)
    }
}

#[derive(StructOpt)]
struct PrintOutputs {
    /// Print every field instead of a summary line
    #[structopt(long)]
    verbose: bool,
}

impl PrintOutputs {
    fn run(self, options: GlobalOptions) -> Result<(), Error> {
        let cm = options.connect()?;
        let resources = cm.get_screen_resources_current(None)?;
        let primary = cm.get_output_primary(None)?;

        for output in resources.outputs() {
            let info = match resources.output_info(output) {
                Ok(info) => info,
                Err(e) => {
                    println!("Error getting output info: {}", e);
                    continue;
                }
            };
            if self.verbose {
                println!("{:#x} = {}", output, Resource::from(info).to_record());
                continue;
            }

            let name = lossy(&info.name());
            if info.connection_state() != ConnectionState::Connected {
                println!("{}: {}", name, info.connection_state().name());
                continue;
            }
            let marker = if primary == Some(output) { " primary" } else { "" };
            match info.crtc() {
                Some(crtc) => {
                    let frame = resources.crtc_info(crtc)?.frame();
                    let size = frame.size();
                    let mm = info.mm_size();
                    println!(
                        "{}:{} {}x{}+{}+{} ({}mm x {}mm)",
                        name,
                        marker,
                        size.width,
                        size.height,
                        frame.min.x,
                        frame.min.y,
                        mm.width,
                        mm.height
                    );
                }
                None => println!("{}:{} connected, no CRTC", name, marker),
            }
        }

        Ok(())
    }
}

#[derive(StructOpt)]
struct PrintCrtcs {}

impl PrintCrtcs {
    fn run(self, options: GlobalOptions) -> Result<(), Error> {
        let cm = options.connect()?;
        let resources = cm.get_screen_resources_current(None)?;
        let mut frames = Vec::new();

        for crtc in resources.crtcs() {
            let info = resources.crtc_info(crtc)?;
            frames.push(info.frame());
            let outputs = info.project(CrtcField::Outputs);
            println!(
                "{:#x}: mode {} at {:?} rotation {:?} outputs {}",
                crtc,
                info.project(CrtcField::Mode),
                info.frame(),
                info.rotation(),
                outputs
            );
        }

        if let Some(bounds) = geometry::bounding_box(frames) {
            let size = bounds.size();
            println!("screen: {}x{}", size.width, size.height);
        }
        Ok(())
    }
}

#[derive(StructOpt)]
struct PrintModes {}

impl PrintModes {
    fn run(self, options: GlobalOptions) -> Result<(), Error> {
        let cm = options.connect()?;
        let resources = cm.get_screen_resources_current(None)?;
        for mode in resources.modes() {
            let refresh = mode
                .refresh_rate()
                .map(|hz| format!("{:.2}Hz", hz))
                .unwrap_or_else(|| "-".to_string());
            println!("{:#x} {} {}", mode.id, lossy(&mode.name), refresh);
        }
        Ok(())
    }
}

#[derive(StructOpt)]
struct PrintProperties {
    /// Output id, decimal or 0x-prefixed
    #[structopt(long, parse(try_from_str = parse_xid))]
    output: RROutput,
}

impl PrintProperties {
    fn run(self, options: GlobalOptions) -> Result<(), Error> {
        let cm = options.connect()?;
        let atoms = cm.list_output_properties(self.output)?;
        let ids: Vec<Value> = atoms.iter().map(|a| Value::from(*a)).collect();
        let (_, names) = cm.get_atom_names(&ids)?;

        for (atom, name) in atoms.iter().zip(names) {
            let info = cm.query_output_property(self.output, *atom)?;
            let value = match cm.read_output_property(self.output, *atom, false) {
                Ok(Some(value)) => Value::string(value.bytes),
                Ok(None) => Value::Nil,
                Err(xlib_xrandr::Error::TypeMismatch { .. }) => Value::string("<not a string>"),
                Err(e) => return Err(e.into()),
            };
            println!("{}: {} {}", lossy(&name), value, info.to_record());
        }
        Ok(())
    }
}

#[derive(StructOpt)]
struct Primary {
    /// Make this output primary
    #[structopt(long, parse(try_from_str = parse_xid))]
    set: Option<RROutput>,
}

impl Primary {
    fn run(self, options: GlobalOptions) -> Result<(), Error> {
        let cm = options.connect()?;
        if let Some(output) = self.set {
            cm.set_output_primary(None, Some(output))?;
        }
        match cm.get_output_primary(None)? {
            Some(output) => {
                let resources = cm.get_screen_resources_current(None)?;
                let info = resources.output_info(output)?;
                println!("{:#x} {}", output, info.project(OutputField::Name));
            }
            None => println!("no primary output"),
        }
        Ok(())
    }
}

#[derive(StructOpt)]
struct DisableCrtc {
    /// CRTC id, decimal or 0x-prefixed
    #[structopt(parse(try_from_str = parse_xid))]
    crtc: RRCrtc,
}

impl DisableCrtc {
    fn run(self, options: GlobalOptions) -> Result<(), Error> {
        let cm = options.connect()?;
        let _lock = cm.locked()?;
        let resources = cm.get_screen_resources(None)?;
        let status = cm.disable_crtc(&resources, self.crtc)?;
        if !status.is_success() {
            return Err(anyhow!("Couldn't disable CRTC {:#x}: {}", self.crtc, status.name()));
        }
        Ok(())
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    #[derive(StructOpt)]
    enum Action {
        Outputs(PrintOutputs),
        Crtcs(PrintCrtcs),
        Modes(PrintModes),
        Properties(PrintProperties),
        Primary(Primary),
        DisableCrtc(DisableCrtc),
    }

    #[derive(StructOpt)]
    #[structopt(name = "xrandr-query")]
    struct App {
        #[structopt(flatten)]
        options: GlobalOptions,
        #[structopt(subcommand)]
        action: Action,
    }

    impl App {
        fn run(self) -> Result<(), Error> {
            match self.action {
                Action::Outputs(opts) => opts.run(self.options),
                Action::Crtcs(opts) => opts.run(self.options),
                Action::Modes(opts) => opts.run(self.options),
                Action::Properties(opts) => opts.run(self.options),
                Action::Primary(opts) => opts.run(self.options),
                Action::DisableCrtc(opts) => opts.run(self.options),
            }
        }
    }

    App::from_args().run()
}
