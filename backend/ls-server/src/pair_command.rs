use crate::error::{Result as ServerErrorResult, ServerError};

use ls_config::PairingConfig;
use ls_core::{PairingCodeGenerator, PairingImage, RenderOptions};

use std::path::PathBuf;

use clap::Args;

#[derive(Args, Debug)]
pub struct PairArgs {
    /// Text to encode, usually a server address
    pub text: String,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Quiet zone in modules
    #[arg(long)]
    pub margin: Option<u32>,

    /// Dark module color (#rgb, #rrggbb or #rrggbbaa)
    #[arg(long)]
    pub dark: Option<String>,

    /// Light module color (#rgb, #rrggbb or #rrggbbaa)
    #[arg(long)]
    pub light: Option<String>,

    /// Write the SVG to this file instead of printing the data URI
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl PairArgs {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            margin: self.margin,
            width: self.width,
            dark: self.dark.clone(),
            light: self.light.clone(),
        }
    }
}

pub fn render(pairing: &PairingConfig, args: &PairArgs) -> ServerErrorResult<PairingImage> {
    let generator = PairingCodeGenerator::new(pairing.clone());
    Ok(generator.generate(Some(&args.text), &args.render_options())?)
}

pub fn run(pairing: &PairingConfig, args: PairArgs) -> ServerErrorResult<()> {
    let image = render(pairing, &args)?;

    match args.out {
        Some(ref path) => {
            std::fs::write(path, image.svg()).map_err(|e| ServerError::io(path, e))?
        }
        None => println!("{}", image.data_uri()),
    }

    Ok(())
}
