//! Benchmarks for SQL Server → PostgreSQL conversion.
//!
//! Tests:
//! - Whole-script conversion throughput (SSMS-style export)
//! - Statement splitting
//! - Type mapping and identifier normalization

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mssql2pg::convert::{normalize_identifier, ConvertStats, Converter, TypeMap};
use mssql2pg::parser::{split_batches, split_statements};
use std::hint::black_box;

/// Generate an SSMS "Generate Scripts" export for benchmarking
fn generate_ssms_export(tables: usize, rows_per_table: usize) -> String {
    let mut data = String::new();

    data.push_str("USE [BenchDb]\nGO\nSET ANSI_NULLS ON\nGO\nSET QUOTED_IDENTIFIER ON\nGO\n");

    for t in 0..tables {
        let table_name = format!("Table_{}", t);
        data.push_str(&format!(
            "/****** Object:  Table [dbo].[{0}] ******/\n\
             CREATE TABLE [dbo].[{0}](\n\
             \t[Id] [int] IDENTITY(1,1) NOT NULL,\n\
             \t[Name] [nvarchar](255) NULL,\n\
             \t[Email] [nvarchar](255) NULL,\n\
             \t[Balance] [money] NULL,\n\
             \t[CreatedAt] [datetime] NOT NULL,\n\
              CONSTRAINT [PK_{0}] PRIMARY KEY CLUSTERED \n(\n\t[Id] ASC\n\
             )WITH (PAD_INDEX = OFF, STATISTICS_NORECOMPUTE = OFF) ON [PRIMARY]\n\
             ) ON [PRIMARY]\nGO\n",
            table_name
        ));

        data.push_str(&format!("SET IDENTITY_INSERT [dbo].[{}] ON\n", table_name));
        for r in 0..rows_per_table {
            data.push_str(&format!(
                "INSERT [dbo].[{}] ([Id], [Name], [Email], [Balance], [CreatedAt]) VALUES \
                 ({}, N'User {}', N'user{}@example.com', CAST(12.5000 AS Decimal(19, 4)), \
                 CAST(N'2024-01-01T12:00:00.000' AS DateTime))\n",
                table_name, r, r, r
            ));
        }
        data.push_str(&format!("SET IDENTITY_INSERT [dbo].[{}] OFF\nGO\n", table_name));
    }

    data
}

fn bench_convert_script(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_script");
    group.sample_size(20);

    for (tables, rows) in [(5, 100), (10, 500), (20, 1000)] {
        let data = generate_ssms_export(tables, rows);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("convert", format!("{}t_{}r", tables, rows)),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut converter = Converter::new();
                    let mut stats = ConvertStats::default();
                    let blocks = converter.convert_script(data, &mut stats);
                    black_box(blocks.len())
                })
            },
        );
    }

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let data = generate_ssms_export(10, 500);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("batches_and_statements", |b| {
        b.iter(|| {
            let count: usize = split_batches(black_box(&data))
                .into_iter()
                .map(|batch| split_statements(batch).len())
                .sum();
            black_box(count)
        })
    });

    group.finish();
}

fn bench_type_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("type_mapping");
    let types = TypeMap::new();
    let tokens = [
        "NVARCHAR(255)",
        "MONEY",
        "DateTime",
        "Decimal(18, 2)",
        "nvarchar(max)",
        "INT",
    ];
    let definitions = [
        "nvarchar(255) NOT NULL",
        "int IDENTITY(1,1) NOT NULL",
        "datetime NOT NULL DEFAULT (getdate())",
        "uniqueidentifier ROWGUIDCOL NOT NULL",
    ];

    group.bench_function("map", |b| {
        b.iter(|| {
            for token in &tokens {
                black_box(types.map(black_box(token)));
            }
        })
    });

    group.bench_function("find_in", |b| {
        b.iter(|| {
            for def in &definitions {
                black_box(types.find_in(black_box(def)));
            }
        })
    });

    group.bench_function("normalize_identifier", |b| {
        b.iter(|| black_box(normalize_identifier(black_box("[dbo].[CustomerOrderLines]"))))
    });

    group.finish();
}

criterion_group!(benches, bench_convert_script, bench_split, bench_type_mapping);

criterion_main!(benches);
