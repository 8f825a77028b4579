//! Command-line arguments and their translation into watermark options

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use watermark_core::config::{DrawingConfig, GridConfig, InsertConfig};
use watermark_core::{
    DrawingOptions, FilesOptions, Layout, WatermarkConfig, WatermarkError, WatermarkSource,
};

/// Command-line arguments for pdf-watermark
#[derive(Parser, Debug)]
#[command(name = "pdf-watermark")]
#[command(version, about = "Add text or image watermarks to PDF files")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with default drawing, grid and insert options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print a JSON report on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Place a single watermark at a position of each page
    Insert {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        insert: InsertArgs,
    },
    /// Tile the watermark over a grid covering each page
    Grid {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// List installed fonts that can render Chinese text
    ListChineseFonts,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// PDF file, or directory searched recursively for PDF files
    pub file: PathBuf,

    /// Watermark text, or path to an image file
    pub watermark: String,

    /// Where to write the result (file, or directory when FILE is one).
    /// Defaults to overwriting the input
    #[arg(short, long)]
    pub save: Option<PathBuf>,

    /// Watermark opacity between 0 and 1 [default: 0.1]
    #[arg(short, long)]
    pub opacity: Option<f64>,

    /// Counter-clockwise rotation in degrees [default: 45]
    #[arg(short, long, allow_hyphen_values = true)]
    pub angle: Option<f64>,

    /// Text colour as #RRGGBB [default: #000000]
    #[arg(long)]
    pub text_color: Option<String>,

    /// Text font [default: Helvetica]
    #[arg(long)]
    pub text_font: Option<String>,

    /// Text size in points [default: 12]
    #[arg(long)]
    pub text_size: Option<f64>,

    /// Draw text as shapes so it cannot be selected or copied
    #[arg(long)]
    pub unselectable: bool,

    /// Scale factor applied to the image after fitting it [default: 1]
    #[arg(long)]
    pub image_scale: Option<f64>,
}

impl CommonArgs {
    pub fn drawing_overrides(&self) -> DrawingConfig {
        DrawingConfig {
            opacity: self.opacity,
            angle: self.angle,
            text_color: self.text_color.clone(),
            text_font: self.text_font.clone(),
            text_size: self.text_size,
            unselectable: self.unselectable.then_some(true),
            image_scale: self.image_scale,
        }
    }
}

#[derive(Args, Debug)]
pub struct InsertArgs {
    /// Horizontal position as a fraction of the page width [default: 0.5]
    #[arg(short = 'x', long = "x")]
    pub x: Option<f64>,

    /// Vertical position as a fraction of the page height [default: 0.5]
    #[arg(short = 'y', long = "y")]
    pub y: Option<f64>,

    /// Which side of the position the watermark extends to: left, right or
    /// center [default: center]
    #[arg(long)]
    pub horizontal_alignment: Option<String>,
}

impl InsertArgs {
    pub fn overrides(&self) -> InsertConfig {
        InsertConfig {
            x: self.x,
            y: self.y,
            horizontal_alignment: self.horizontal_alignment.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct GridArgs {
    /// Number of boxes across the page [default: 3]
    #[arg(long)]
    pub horizontal_boxes: Option<u32>,

    /// Number of boxes down the page [default: 6]
    #[arg(long)]
    pub vertical_boxes: Option<u32>,

    /// Draw in the middle of each box instead of on the box corners
    #[arg(short, long)]
    pub margin: bool,
}

impl GridArgs {
    pub fn overrides(&self) -> GridConfig {
        GridConfig {
            horizontal_boxes: self.horizontal_boxes,
            vertical_boxes: self.vertical_boxes,
            margin: self.margin.then_some(true),
        }
    }
}

/// Everything needed to run one watermarking command
#[derive(Debug)]
pub struct Job {
    pub files: FilesOptions,
    pub drawing: DrawingOptions,
    pub layout: Layout,
}

impl Job {
    /// Combine command-line values with the config file; the command line wins
    pub fn from_common(
        common: &CommonArgs,
        layout: Layout,
        config: &WatermarkConfig,
    ) -> Result<Self, WatermarkError> {
        let files = FilesOptions::new(&common.file, common.save.as_deref())?;
        let drawing = config
            .drawing
            .merge(&common.drawing_overrides())
            .build(WatermarkSource::from_arg(&common.watermark))?;
        Ok(Self {
            files,
            drawing,
            layout,
        })
    }

    pub fn insert(
        common: &CommonArgs,
        insert: &InsertArgs,
        config: &WatermarkConfig,
    ) -> Result<Self, WatermarkError> {
        let layout = Layout::Insert(config.insert.merge(&insert.overrides()).build()?);
        Self::from_common(common, layout, config)
    }

    pub fn grid(
        common: &CommonArgs,
        grid: &GridArgs,
        config: &WatermarkConfig,
    ) -> Result<Self, WatermarkError> {
        let layout = Layout::Grid(config.grid.merge(&grid.overrides()).build()?);
        Self::from_common(common, layout, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use watermark_core::{Alignment, GridOptions, InsertOptions};

    fn pdf_file() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        std::fs::write(file.path(), b"%PDF-1.5").unwrap();
        file
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_insert_arguments() {
        let file = pdf_file();
        let path = file.path().to_str().unwrap();
        let cli = parse(&[
            "pdf-watermark",
            "insert",
            path,
            "DRAFT",
            "-x",
            "0.25",
            "-y",
            "0.75",
            "--horizontal-alignment",
            "left",
            "-o",
            "0.4",
            "-a",
            "-30",
        ]);

        let Command::Insert { common, insert } = &cli.command else {
            panic!("expected insert command");
        };
        let job = Job::insert(common, insert, &WatermarkConfig::default()).unwrap();

        assert_eq!(
            job.layout,
            Layout::Insert(InsertOptions {
                x: 0.25,
                y: 0.75,
                horizontal_alignment: Alignment::Left,
            })
        );
        assert_eq!(job.drawing.opacity, 0.4);
        assert_eq!(job.drawing.angle, -30.0);
        assert_eq!(job.drawing.text(), Some("DRAFT"));
        let pairs: Vec<_> = job.files.iter().collect();
        assert_eq!(pairs, vec![(file.path(), file.path())]);
    }

    #[test]
    fn test_grid_arguments_with_config() {
        let file = pdf_file();
        let path = file.path().to_str().unwrap();
        let cli = parse(&[
            "pdf-watermark",
            "--config",
            "unused.toml",
            "grid",
            path,
            "SAMPLE",
            "--horizontal-boxes",
            "5",
            "--margin",
            "--unselectable",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("unused.toml")));

        let config = WatermarkConfig::from_str(
            "[grid]\nhorizontal_boxes = 2\nvertical_boxes = 4\n[drawing]\ntext_size = 20\n",
        )
        .unwrap();
        let Command::Grid { common, grid } = &cli.command else {
            panic!("expected grid command");
        };
        let job = Job::grid(common, grid, &config).unwrap();

        assert_eq!(
            job.layout,
            Layout::Grid(GridOptions {
                horizontal_boxes: 5,
                vertical_boxes: 4,
                margin: true,
            })
        );
        assert_eq!(job.drawing.text_size, 20.0);
        assert!(job.drawing.unselectable);
    }

    #[test]
    fn test_flags_left_off_do_not_override_config() {
        let file = pdf_file();
        let path = file.path().to_str().unwrap();
        let cli = parse(&["pdf-watermark", "grid", path, "SAMPLE"]);
        let config = WatermarkConfig::from_str("[grid]\nmargin = true\n").unwrap();

        let Command::Grid { common, grid } = &cli.command else {
            panic!("expected grid command");
        };
        let job = Job::grid(common, grid, &config).unwrap();
        assert_eq!(
            job.layout,
            Layout::Grid(GridOptions {
                margin: true,
                ..GridOptions::default()
            })
        );
    }

    #[test]
    fn test_invalid_alignment_is_reported() {
        let file = pdf_file();
        let path = file.path().to_str().unwrap();
        let cli = parse(&[
            "pdf-watermark",
            "insert",
            path,
            "DRAFT",
            "--horizontal-alignment",
            "top",
        ]);
        let Command::Insert { common, insert } = &cli.command else {
            panic!("expected insert command");
        };
        let err = Job::insert(common, insert, &WatermarkConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid alignment value: 'top'");
    }

    #[test]
    fn test_image_watermark_detected() {
        let file = pdf_file();
        let image = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        let cli = parse(&[
            "pdf-watermark",
            "grid",
            file.path().to_str().unwrap(),
            image.path().to_str().unwrap(),
        ]);
        let Command::Grid { common, grid } = &cli.command else {
            panic!("expected grid command");
        };
        let job = Job::grid(common, grid, &WatermarkConfig::default()).unwrap();
        assert_eq!(job.drawing.image(), Some(image.path()));
    }

    #[test]
    fn test_list_chinese_fonts_parses() {
        let cli = parse(&["pdf-watermark", "-v", "list-chinese-fonts"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::ListChineseFonts));
    }
}
